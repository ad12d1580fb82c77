//! Point-in-time delivery counters for one endpoint

/// Snapshot of endpoint counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Records currently waiting in the inbound queue
    pub queue_len: usize,
    /// Records accepted by `write`
    pub records_accepted: u64,
    /// Records rejected because the inbound queue was full
    pub records_dropped: u64,
    /// Records included in delivered batches
    pub records_sent: u64,
    /// Batches that produced an outcome
    pub batches_sent: u64,
    /// Batches lost to network or body read failures
    pub batch_failures: u64,
    /// Outcomes discarded because the response queue was full
    pub outcomes_dropped: u64,
    /// Duration of the most recent send, in microseconds
    pub last_send_micros: u64,
}
