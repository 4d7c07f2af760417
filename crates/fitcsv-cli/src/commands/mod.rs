pub mod convert;
pub mod inspect;

use fitcsv_core::ResyncPolicy;

/// Record-level recovery for the `--strict` flag.
pub fn resync_policy(strict: bool) -> ResyncPolicy {
    if strict {
        ResyncPolicy::Abort
    } else {
        ResyncPolicy::SkipByte
    }
}
