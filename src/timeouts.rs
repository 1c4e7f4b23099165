pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const DEFAULT_WAIT: u64 = 10_000;
    pub const CLICK_PACING: u64 = 300;
    pub const CONFIRM_RETRY_DELAY: u64 = 5000;
    pub const JITTER_MIN: u64 = 400;
    pub const JITTER_MAX: u64 = 700;
    pub const PAGE_SETTLE: u64 = 1000;
    pub const BANNER_SETTLE: u64 = 2000;
    pub const LOGIN_PAGE_SETTLE: u64 = 3000;
}

pub mod secs {
    pub const REQUEST: u64 = 120;
    pub const NOTIFY_REQUEST: u64 = 10;
}
