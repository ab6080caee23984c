//! Named per-step output channels.
//!
//! Each module records its metrics into channels named `<module>.<metric>`
//! (e.g. `gonorrhea.n_infected`); the driver records `year` and `n_alive`
//! itself.  Every channel is a dense `Vec<f64>` with one slot per
//! timepoint, zero-filled on creation so modules can write by index.

use rustc_hash::FxHashMap;

/// Time-series output of one simulation run.
#[derive(Clone, Debug, Default)]
pub struct Results {
    npts: usize,
    channels: FxHashMap<String, Vec<f64>>,
    /// Insertion order, for stable iteration and display.
    order: Vec<String>,
}

impl Results {
    /// Create a result set with `npts` timepoints per channel.
    pub fn new(npts: usize) -> Self {
        Self {
            npts,
            channels: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Number of timepoints per channel.
    pub fn npts(&self) -> usize {
        self.npts
    }

    /// Mutable access to a channel, creating it zero-filled on first use.
    pub fn channel_mut(&mut self, name: &str) -> &mut Vec<f64> {
        if !self.channels.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| vec![0.0; self.npts])
    }

    /// Write one value into one channel at step `ti`.
    ///
    /// # Panics
    /// Panics if `ti` is past the end of the run (a driver bug).
    pub fn record(&mut self, name: &str, ti: usize, value: f64) {
        self.channel_mut(name)[ti] = value;
    }

    /// Add `value` to the channel at step `ti`.
    pub fn add(&mut self, name: &str, ti: usize, value: f64) {
        self.channel_mut(name)[ti] += value;
    }

    /// Read-only access to a channel, if it exists.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// Replace a channel wholesale (used by module finalizers, e.g. to store
    /// a cumulative sum).
    ///
    /// # Panics
    /// Panics if `values.len() != npts`.
    pub fn set_channel(&mut self, name: &str, values: Vec<f64>) {
        assert_eq!(values.len(), self.npts, "channel length mismatch");
        *self.channel_mut(name) = values;
    }

    /// Channel names in insertion order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `true` if a channel with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }
}
