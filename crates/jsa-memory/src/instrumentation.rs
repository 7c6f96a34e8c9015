//! Vector lifecycle instrumentation.
//!
//! This module records what happens to growable arrays over their lifetime
//! (create, append, assign, clear, destroy) together with their size and
//! capacity at each step, then aggregates the log per owner label:
//!
//! - how large each kind of vector gets (to pick in-situ capacities), and
//! - how appends interact with storage (to find copying reallocations).
//!
//! Recording goes through an [`InstrumentationSink`]. [`NoInstrumentation`]
//! compiles every call away; [`VectorInstrumentation`] keeps the log. With
//! the `vector-profiling` feature a process-wide log is available through
//! [`VectorInstrumentation::global`] and [`default_sink`].
//!
//! Set `JSA_DUMP_VECTORS` and hold the guard from
//! [`VectorInstrumentation::dump_on_drop_if_requested`] to print both
//! histograms to stderr when the program finishes.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use jsa_common::limits::UNLIMITED_LINE_LENGTH;
use rustc_hash::FxHashMap;

/// Environment variable that requests a histogram dump on exit.
pub const DUMP_VECTORS_ENV: &str = "JSA_DUMP_VECTORS";

/// What happened to a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorEvent {
    Append,
    Assign,
    Clear,
    Create,
    Destroy,
}

impl VectorEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            VectorEvent::Append => "append",
            VectorEvent::Assign => "assign",
            VectorEvent::Clear => "clear",
            VectorEvent::Create => "create",
            VectorEvent::Destroy => "destroy",
        }
    }
}

/// A record of one vector event. Never modified after it is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentationEntry {
    /// Unique id of the vector instance
    pub instance_id: u64,
    /// Label naming the code that owns the vector
    pub owner: &'static str,
    pub event: VectorEvent,
    /// Address of the vector's storage, 0 when nothing is allocated
    pub storage_address: usize,
    pub size: usize,
    pub capacity: usize,
}

impl fmt::Display for InstrumentationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} data={:#x} size={} capacity={}",
            self.instance_id,
            self.owner,
            self.event.as_str(),
            self.storage_address,
            self.size,
            self.capacity
        )
    }
}

/// Destination for vector lifecycle events.
pub trait InstrumentationSink {
    /// `false` lets callers skip gathering entry data entirely.
    const ENABLED: bool;

    /// Allocate an id for a new vector instance.
    fn register_instance(&self) -> u64;

    fn add_entry(&self, entry: InstrumentationEntry);
}

/// A sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstrumentation;

impl InstrumentationSink for NoInstrumentation {
    const ENABLED: bool = false;

    #[inline(always)]
    fn register_instance(&self) -> u64 {
        0
    }

    #[inline(always)]
    fn add_entry(&self, _entry: InstrumentationEntry) {}
}

/// Counts of how appends interacted with storage, for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityChangeHistogram {
    /// Appends that allocated the vector's first storage
    pub appends_initial_capacity: usize,
    /// Appends that kept the storage in place, growing it or not
    pub appends_reusing_capacity: usize,
    /// Appends that moved the elements into new storage
    pub appends_growing_capacity: usize,
}

impl CapacityChangeHistogram {
    pub fn total(&self) -> usize {
        self.appends_initial_capacity + self.appends_reusing_capacity + self.appends_growing_capacity
    }
}

/// Per owner: maximum size reached → number of instances reaching it.
pub type MaxSizeHistogram = BTreeMap<&'static str, BTreeMap<usize, usize>>;

/// Per owner: capacity behavior of appends.
pub type CapacityChangeHistogramByOwner = BTreeMap<&'static str, CapacityChangeHistogram>;

/// Layout options for [`VectorInstrumentation::dump_max_size_histogram`].
#[derive(Debug, Clone, Copy)]
pub struct MaxSizeDumpOptions {
    pub maximum_line_length: usize,
    /// Runs of more empty rows than this collapse into a single `...`
    pub max_adjacent_empty_rows: usize,
}

impl Default for MaxSizeDumpOptions {
    fn default() -> Self {
        MaxSizeDumpOptions {
            maximum_line_length: UNLIMITED_LINE_LENGTH,
            max_adjacent_empty_rows: usize::MAX,
        }
    }
}

/// Layout options for [`VectorInstrumentation::dump_capacity_change_histogram`].
#[derive(Debug, Clone, Copy)]
pub struct CapacityChangeDumpOptions {
    pub maximum_line_length: usize,
}

impl Default for CapacityChangeDumpOptions {
    fn default() -> Self {
        CapacityChangeDumpOptions {
            maximum_line_length: 80,
        }
    }
}

/// An append-only log of vector events.
#[derive(Debug, Default)]
pub struct VectorInstrumentation {
    entries: Mutex<Vec<InstrumentationEntry>>,
    next_instance_id: AtomicU64,
}

impl VectorInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide log.
    #[cfg(feature = "vector-profiling")]
    pub fn global() -> &'static VectorInstrumentation {
        static INSTANCE: once_cell::sync::Lazy<VectorInstrumentation> =
            once_cell::sync::Lazy::new(VectorInstrumentation::new);
        &INSTANCE
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InstrumentationEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append an entry to the log.
    pub fn add_entry(&self, entry: InstrumentationEntry) {
        self.lock().push(entry);
    }

    /// Snapshot of every entry, in logging order.
    pub fn entries(&self) -> Vec<InstrumentationEntry> {
        self.lock().clone()
    }

    /// Forget every entry. Instance ids keep counting up.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// For each owner, how many instances reached each maximum size.
    pub fn max_size_histogram_by_owner(&self) -> MaxSizeHistogram {
        let entries = self.lock();
        let mut max_sizes: FxHashMap<u64, (&'static str, usize)> = FxHashMap::default();
        for entry in entries.iter() {
            let slot = max_sizes
                .entry(entry.instance_id)
                .or_insert((entry.owner, entry.size));
            slot.1 = slot.1.max(entry.size);
        }

        let mut histogram = MaxSizeHistogram::new();
        for (owner, max_size) in max_sizes.into_values() {
            *histogram
                .entry(owner)
                .or_default()
                .entry(max_size)
                .or_default() += 1;
        }
        histogram
    }

    /// For each owner, classify every append by what happened to the
    /// instance's storage since its previous entry:
    ///
    /// - same address: the append fit (in-place arena growth included);
    /// - no storage and no elements before: first allocation;
    /// - otherwise the elements were copied into new storage.
    ///
    /// Inline storage reports address 0, so appends into it count as reused
    /// and spilling it to the heap counts as growing.
    pub fn capacity_change_histogram_by_owner(&self) -> CapacityChangeHistogramByOwner {
        let entries = self.lock();
        // instance -> (storage address, size) of its previous entry
        let mut last_storage: FxHashMap<u64, (usize, usize)> = FxHashMap::default();
        let mut histogram = CapacityChangeHistogramByOwner::new();
        for entry in entries.iter() {
            let previous =
                last_storage.insert(entry.instance_id, (entry.storage_address, entry.size));
            if entry.event != VectorEvent::Append {
                continue;
            }
            let counts = histogram.entry(entry.owner).or_default();
            match previous.unwrap_or((0, 0)) {
                (address, _) if address == entry.storage_address => {
                    counts.appends_reusing_capacity += 1;
                }
                (0, 0) => counts.appends_initial_capacity += 1,
                _ => counts.appends_growing_capacity += 1,
            }
        }
        histogram
    }

    /// Render a max-size histogram, one bar per size, one block per owner.
    pub fn dump_max_size_histogram(
        histogram: &MaxSizeHistogram,
        out: &mut impl fmt::Write,
        options: &MaxSizeDumpOptions,
    ) -> fmt::Result {
        let mut first_owner = true;
        for (owner, counts) in histogram {
            let Some((&max_size, _)) = counts.last_key_value() else {
                continue;
            };
            if !first_owner {
                writeln!(out)?;
            }
            first_owner = false;

            let total: usize = counts.values().sum();
            let max_count = counts.values().copied().max().unwrap_or(0);
            let size_width = decimal_width(max_size);
            writeln!(out, "Max sizes for {owner}:")?;

            let mut adjacent_empty_rows = 0usize;
            for size in 0..=max_size {
                let count = counts.get(&size).copied().unwrap_or(0);
                if count == 0 {
                    adjacent_empty_rows += 1;
                    if adjacent_empty_rows > options.max_adjacent_empty_rows {
                        if adjacent_empty_rows == options.max_adjacent_empty_rows + 1 {
                            writeln!(out, "...")?;
                        }
                        continue;
                    }
                } else {
                    adjacent_empty_rows = 0;
                }

                let prefix = format!(
                    "{size:>size_width$}  ({:>3}%) ",
                    percent(count, total)
                );
                let bar_width = scaled_bar(
                    count,
                    max_count,
                    options.maximum_line_length.saturating_sub(prefix.len()),
                );
                let line = format!("{prefix}{}", "*".repeat(bar_width));
                writeln!(out, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }

    /// Render capacity-change counts, one block per owner.
    pub fn dump_capacity_change_histogram(
        histogram: &CapacityChangeHistogramByOwner,
        out: &mut impl fmt::Write,
        options: &CapacityChangeDumpOptions,
    ) -> fmt::Result {
        let mut first_owner = true;
        for (owner, counts) in histogram {
            if !first_owner {
                writeln!(out)?;
            }
            first_owner = false;

            let total = counts.total();
            let rows = [
                ("initial", counts.appends_initial_capacity),
                ("reused", counts.appends_reusing_capacity),
                ("grown", counts.appends_growing_capacity),
            ];
            let count_width = rows
                .iter()
                .map(|&(_, count)| decimal_width(count))
                .max()
                .unwrap_or(1);
            writeln!(out, "Capacity changes for {owner}:")?;
            for (label, count) in rows {
                let prefix = format!(
                    "  {label:<7} {count:>count_width$} ({:>3}%) ",
                    percent(count, total)
                );
                let bar_width = scaled_bar(
                    count,
                    total,
                    options.maximum_line_length.saturating_sub(prefix.len()),
                );
                let line = format!("{prefix}{}", "*".repeat(bar_width));
                writeln!(out, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }

    /// Both histograms, rendered with default options.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = Self::dump_max_size_histogram(
            &self.max_size_histogram_by_owner(),
            &mut out,
            &MaxSizeDumpOptions::default(),
        );
        out.push('\n');
        let _ = Self::dump_capacity_change_histogram(
            &self.capacity_change_histogram_by_owner(),
            &mut out,
            &CapacityChangeDumpOptions::default(),
        );
        out
    }

    /// Guard that writes [`summary`](Self::summary) to stderr when dropped,
    /// if `JSA_DUMP_VECTORS` is set.
    pub fn dump_on_drop_if_requested(&self) -> Option<DumpOnDrop<'_, io::Stderr>> {
        std::env::var_os(DUMP_VECTORS_ENV).map(|_| DumpOnDrop::new(self, io::stderr()))
    }
}

impl InstrumentationSink for VectorInstrumentation {
    const ENABLED: bool = true;

    fn register_instance(&self) -> u64 {
        self.next_instance_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn add_entry(&self, entry: InstrumentationEntry) {
        VectorInstrumentation::add_entry(self, entry);
    }
}

/// Writes the instrumentation summary to `out` when dropped.
pub struct DumpOnDrop<'a, W: io::Write> {
    instrumentation: &'a VectorInstrumentation,
    out: W,
}

impl<'a, W: io::Write> DumpOnDrop<'a, W> {
    pub fn new(instrumentation: &'a VectorInstrumentation, out: W) -> Self {
        DumpOnDrop {
            instrumentation,
            out,
        }
    }
}

impl<W: io::Write> Drop for DumpOnDrop<'_, W> {
    fn drop(&mut self) {
        let summary = self.instrumentation.summary();
        // Nothing useful can be done about a failed diagnostic write here.
        let _ = self.out.write_all(summary.as_bytes());
        let _ = self.out.flush();
    }
}

/// The sink selected at compile time.
#[cfg(feature = "vector-profiling")]
pub type DefaultSink = VectorInstrumentation;
#[cfg(not(feature = "vector-profiling"))]
pub type DefaultSink = NoInstrumentation;

#[cfg(feature = "vector-profiling")]
pub fn default_sink() -> &'static DefaultSink {
    VectorInstrumentation::global()
}

#[cfg(not(feature = "vector-profiling"))]
pub fn default_sink() -> &'static DefaultSink {
    &NoInstrumentation
}

fn decimal_width(value: usize) -> usize {
    value.checked_ilog10().map_or(1, |digits| digits as usize + 1)
}

/// Rounded percentage of `count` in `total`.
fn percent(count: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        (count * 100 + total / 2) / total
    }
}

/// Bar length for `count`, scaled so `max_count` fills `available` columns.
/// Without a line limit, one column per count. Non-zero counts always get
/// at least one column.
fn scaled_bar(count: usize, max_count: usize, available: usize) -> usize {
    if count == 0 || max_count == 0 {
        return 0;
    }
    if available >= max_count {
        return count;
    }
    (count * available / max_count).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, owner: &'static str, event: VectorEvent, size: usize, capacity: usize) -> InstrumentationEntry {
        InstrumentationEntry {
            instance_id: id,
            owner,
            event,
            storage_address: if capacity == 0 { 0 } else { 0x1000 },
            size,
            capacity,
        }
    }

    #[test]
    fn test_entry_display() {
        let e = entry(3, "tokens", VectorEvent::Append, 1, 4);
        assert_eq!(e.to_string(), "#3 tokens append data=0x1000 size=1 capacity=4");
    }

    #[test]
    fn test_register_instance_is_unique() {
        let log = VectorInstrumentation::new();
        let a = log.register_instance();
        let b = log.register_instance();
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_clear_resets_log() {
        let log = VectorInstrumentation::new();
        log.add_entry(entry(1, "a", VectorEvent::Create, 0, 0));
        assert_eq!(log.entries().len(), 1);
        log.clear();
        assert!(log.entries().is_empty());
        assert!(log.max_size_histogram_by_owner().is_empty());
    }

    #[test]
    fn test_scaled_bar() {
        assert_eq!(scaled_bar(0, 10, 5), 0);
        assert_eq!(scaled_bar(3, 10, 100), 3);
        assert_eq!(scaled_bar(10, 10, 5), 5);
        assert_eq!(scaled_bar(1, 10, 5), 1);
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_dump_on_drop_writes_summary() {
        let log = VectorInstrumentation::new();
        log.add_entry(entry(1, "nodes", VectorEvent::Create, 0, 0));
        log.add_entry(entry(1, "nodes", VectorEvent::Append, 1, 4));

        let mut out = Vec::new();
        drop(DumpOnDrop::new(&log, &mut out));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Max sizes for nodes:"), "got: {text}");
        assert!(text.contains("Capacity changes for nodes:"), "got: {text}");
    }
}
