//! The fixed-slot plugin table.
//!
//! Slots `[0, count)` always hold a plugin whose id equals its slot index;
//! everything above is empty. Removal compacts the occupied prefix so the
//! invariant survives, and the audio thread indexes the table branch-free.
//!
//! Access discipline: slot contents are only touched by whoever holds the
//! post-action slot: the audio thread while draining a pending action (or
//! plain processing), or the control thread while the engine is stopped.
//! Appends are safe while running because the new slot is written before the
//! count is published. Peaks are atomics and may be read from anywhere.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::consts::MAX_PEAKS;
use crate::lockfree::AtomicFloat;
use crate::meters::ChannelLevels;
use crate::plugin::PluginInstance;

pub struct PluginSlot {
    instance: UnsafeCell<Option<PluginInstance>>,
    in_peak: [AtomicFloat; MAX_PEAKS],
    out_peak: [AtomicFloat; MAX_PEAKS],
    in_rms: [AtomicFloat; MAX_PEAKS],
    out_rms: [AtomicFloat; MAX_PEAKS],
}

// SAFETY: see the module-level access discipline.
unsafe impl Send for PluginSlot {}
unsafe impl Sync for PluginSlot {}

impl PluginSlot {
    fn empty() -> Self {
        Self {
            instance: UnsafeCell::new(None),
            in_peak: std::array::from_fn(|_| AtomicFloat::default()),
            out_peak: std::array::from_fn(|_| AtomicFloat::default()),
            in_rms: std::array::from_fn(|_| AtomicFloat::default()),
            out_rms: std::array::from_fn(|_| AtomicFloat::default()),
        }
    }

    fn zero_peaks(&self) {
        for level in self
            .in_peak
            .iter()
            .chain(self.out_peak.iter())
            .chain(self.in_rms.iter())
            .chain(self.out_rms.iter())
        {
            level.set(0.0);
        }
    }
}

pub struct PluginTable {
    slots: Box<[PluginSlot]>,
    count: AtomicU32,
}

impl PluginTable {
    pub fn new(max_plugins: usize) -> Self {
        Self {
            slots: (0..max_plugins).map(|_| PluginSlot::empty()).collect(),
            count: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn max_plugins(&self) -> usize {
        self.slots.len()
    }

    /// Install a plugin into the next free slot and publish it.
    ///
    /// Safe while the engine runs: the slot write happens before the count
    /// store that makes the audio thread look at it.
    pub fn install(&self, instance: PluginInstance) -> u32 {
        let id = self.count();
        debug_assert!((id as usize) < self.slots.len());
        debug_assert_eq!(instance.control.id(), id);

        let slot = &self.slots[id as usize];
        // SAFETY: slot `id` is above the published count, so nothing reads it.
        unsafe { *slot.instance.get() = Some(instance) };
        slot.zero_peaks();

        self.count.store(id + 1, Ordering::Release);
        id
    }

    /// Shared access to a slot's plugin.
    ///
    /// # Safety
    /// Caller must hold the post-action slot (audio thread inside a block, or
    /// control thread with the engine stopped), and `id` must be below the
    /// published count.
    pub unsafe fn instance(&self, id: u32) -> Option<&PluginInstance> {
        (*self.slots[id as usize].instance.get()).as_ref()
    }

    /// Mutable access to a slot's plugin, for processing.
    ///
    /// # Safety
    /// As [`instance`](Self::instance), plus no other borrow of this slot may
    /// be live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn instance_mut(&self, id: u32) -> Option<&mut PluginInstance> {
        (*self.slots[id as usize].instance.get()).as_mut()
    }

    /// Remove slot `id` and shift everything above it one slot down,
    /// re-assigning ids and zeroing moved peaks. Returns the removed plugin
    /// so the caller can destroy it off the audio thread.
    ///
    /// # Safety
    /// Caller must hold the post-action slot.
    pub unsafe fn remove_and_compact(&self, id: u32) -> Option<PluginInstance> {
        let old_count = self.count();
        debug_assert!(old_count > 0);
        debug_assert!(id < old_count);

        let new_count = old_count - 1;
        self.count.store(new_count, Ordering::Release);

        let removed = (*self.slots[id as usize].instance.get()).take();

        for i in id..new_count {
            let src = self.slots[i as usize + 1].instance.get();
            let dst = self.slots[i as usize].instance.get();

            let moved = (*src).take();
            debug_assert!(moved.is_some());

            if let Some(instance) = &moved {
                instance.control.set_id(i);
            }

            *dst = moved;
            self.slots[i as usize].zero_peaks();
        }

        removed
    }

    /// Unpublish every slot at once (the count goes to zero; slot contents
    /// stay behind for [`drain_all`](Self::drain_all)).
    pub fn set_count_zero(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Collect all plugins left in the table for off-thread destruction.
    ///
    /// # Safety
    /// Caller must hold the post-action slot and have already unpublished the
    /// slots via [`set_count_zero`](Self::set_count_zero).
    pub unsafe fn drain_all(&self, old_count: u32) -> Vec<PluginInstance> {
        let mut drained = Vec::with_capacity(old_count as usize);

        for slot in self.slots.iter().take(old_count as usize) {
            if let Some(instance) = (*slot.instance.get()).take() {
                drained.push(instance);
            }
            slot.zero_peaks();
        }

        drained
    }

    /// Record a plugin's per-channel levels for this block. Peaks accumulate
    /// with a saturating max until [`consume_peaks`](Self::consume_peaks)
    /// resets them; RMS holds the last block.
    pub fn set_levels(
        &self,
        id: u32,
        ins: [ChannelLevels; MAX_PEAKS],
        outs: [ChannelLevels; MAX_PEAKS],
    ) {
        let slot = &self.slots[id as usize];
        for ch in 0..MAX_PEAKS {
            slot.in_peak[ch].store_max(ins[ch].peak);
            slot.out_peak[ch].store_max(outs[ch].peak);
            slot.in_rms[ch].set(ins[ch].rms);
            slot.out_rms[ch].set(outs[ch].rms);
        }
    }

    /// Take the peaks accumulated since the last call, resetting them to
    /// zero. The housekeeping pass uses this to report max-since-last-report
    /// values to the control surface.
    pub fn consume_peaks(&self, id: u32) -> ([f32; MAX_PEAKS], [f32; MAX_PEAKS]) {
        if id >= self.count() {
            return ([0.0; MAX_PEAKS], [0.0; MAX_PEAKS]);
        }

        let slot = &self.slots[id as usize];
        (
            std::array::from_fn(|ch| slot.in_peak[ch].swap(0.0)),
            std::array::from_fn(|ch| slot.out_peak[ch].swap(0.0)),
        )
    }

    pub fn input_peak(&self, id: u32, channel: usize) -> f32 {
        if id >= self.count() || channel >= MAX_PEAKS {
            return 0.0;
        }
        self.slots[id as usize].in_peak[channel].get()
    }

    pub fn output_peak(&self, id: u32, channel: usize) -> f32 {
        if id >= self.count() || channel >= MAX_PEAKS {
            return 0.0;
        }
        self.slots[id as usize].out_peak[channel].get()
    }

    pub fn input_rms(&self, id: u32, channel: usize) -> f32 {
        if id >= self.count() || channel >= MAX_PEAKS {
            return 0.0;
        }
        self.slots[id as usize].in_rms[channel].get()
    }

    pub fn output_rms(&self, id: u32, channel: usize) -> f32 {
        if id >= self.count() || channel >= MAX_PEAKS {
            return 0.0;
        }
        self.slots[id as usize].out_rms[channel].get()
    }
}

impl std::fmt::Debug for PluginTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginTable")
            .field("count", &self.count())
            .field("max_plugins", &self.max_plugins())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EngineClient;
    use crate::driver::EngineType;
    use crate::options::ProcessMode;
    use crate::plugin::{new_internal_plugin, PluginInit};

    fn make_instance(id: u32, name: &str) -> PluginInstance {
        let client = EngineClient::new(EngineType::Null, ProcessMode::ContinuousRack, None);
        let init = PluginInit {
            id,
            name,
            label: "noop",
            filename: "null",
            client: &client,
        };
        let (control, unit) = new_internal_plugin(&init).unwrap();
        PluginInstance {
            control,
            unit,
            client,
        }
    }

    fn names(table: &PluginTable) -> Vec<String> {
        (0..table.count())
            .map(|i| unsafe { table.instance(i).unwrap().control.info().name.clone() })
            .collect()
    }

    #[test]
    fn install_publishes_in_order() {
        let table = PluginTable::new(4);
        assert_eq!(table.install(make_instance(0, "a")), 0);
        assert_eq!(table.install(make_instance(1, "b")), 1);
        assert_eq!(table.count(), 2);
        assert_eq!(names(&table), ["a", "b"]);
    }

    #[test]
    fn compaction_preserves_density_and_ids() {
        let table = PluginTable::new(4);
        for (i, n) in ["a", "b", "c"].iter().enumerate() {
            table.install(make_instance(i as u32, n));
        }

        let removed = unsafe { table.remove_and_compact(1) }.unwrap();
        assert_eq!(removed.control.info().name, "b");
        assert_eq!(table.count(), 2);
        assert_eq!(names(&table), ["a", "c"]);

        for i in 0..table.count() {
            let inst = unsafe { table.instance(i) }.unwrap();
            assert_eq!(inst.control.id(), i);
        }
    }

    #[test]
    fn removing_head_shifts_everything() {
        let table = PluginTable::new(4);
        for (i, n) in ["a", "b", "c"].iter().enumerate() {
            table.install(make_instance(i as u32, n));
        }

        let removed = unsafe { table.remove_and_compact(0) }.unwrap();
        assert_eq!(removed.control.info().name, "a");
        assert_eq!(names(&table), ["b", "c"]);
    }

    #[test]
    fn drain_all_empties_the_table() {
        let table = PluginTable::new(4);
        table.install(make_instance(0, "a"));
        table.install(make_instance(1, "b"));

        let old = table.set_count_zero();
        assert_eq!(old, 2);
        assert_eq!(table.count(), 0);

        let drained = unsafe { table.drain_all(old) };
        assert_eq!(drained.len(), 2);
    }

    fn levels(peak: f32, rms: f32) -> crate::meters::ChannelLevels {
        crate::meters::ChannelLevels { peak, rms }
    }

    #[test]
    fn levels_are_bounds_checked() {
        let table = PluginTable::new(4);
        table.install(make_instance(0, "a"));
        table.set_levels(
            0,
            [levels(0.5, 0.3), levels(0.25, 0.2)],
            [levels(0.75, 0.6), levels(1.0, 0.7)],
        );

        assert_eq!(table.input_peak(0, 0), 0.5);
        assert_eq!(table.output_peak(0, 1), 1.0);
        assert_eq!(table.input_rms(0, 0), 0.3);
        assert_eq!(table.output_rms(0, 1), 0.7);
        assert_eq!(table.input_peak(1, 0), 0.0);
        assert_eq!(table.input_peak(0, 7), 0.0);
    }

    #[test]
    fn peaks_accumulate_until_consumed() {
        let table = PluginTable::new(4);
        table.install(make_instance(0, "a"));

        // quiet block after a loud one: the loud peak survives
        table.set_levels(0, [levels(0.9, 0.6), levels(0.0, 0.0)], [levels(0.4, 0.3); 2]);
        table.set_levels(0, [levels(0.1, 0.1), levels(0.0, 0.0)], [levels(0.2, 0.1); 2]);
        assert_eq!(table.input_peak(0, 0), 0.9);
        // RMS is last-block
        assert_eq!(table.input_rms(0, 0), 0.1);

        let (ins, outs) = table.consume_peaks(0);
        assert_eq!(ins[0], 0.9);
        assert_eq!(outs[0], 0.4);

        // consuming resets the accumulators
        assert_eq!(table.input_peak(0, 0), 0.0);
        let (ins, _) = table.consume_peaks(0);
        assert_eq!(ins[0], 0.0);

        // out-of-range ids read as silence
        assert_eq!(table.consume_peaks(3), ([0.0; 2], [0.0; 2]));
    }
}
