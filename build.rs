//! Stamps the CLI with its build date.
//!
//! `SOURCE_DATE_EPOCH` pins the stamp for reproducible builds; the
//! `MOD3_BUILD_DATE` / `MOD3_BUILD_TIME` variables override either part.

use time::format_description;
use time::OffsetDateTime;

const DATE_FORMAT: &str = "[year]-[month]-[day]";
const TIME_FORMAT: &str = "[hour]:[minute]:[second] UTC";

fn stamp_time() -> OffsetDateTime {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

fn stamp(var: &str, at: OffsetDateTime, format: &str) -> String {
    println!("cargo:rerun-if-env-changed={}", var);
    std::env::var(var).unwrap_or_else(|_| {
        format_description::parse(format)
            .ok()
            .and_then(|items| at.format(&items).ok())
            .unwrap_or_else(|| "unknown".into())
    })
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    let at = stamp_time();
    println!("cargo:rustc-env=MOD3_BUILD_DATE={}", stamp("MOD3_BUILD_DATE", at, DATE_FORMAT));
    println!("cargo:rustc-env=MOD3_BUILD_TIME={}", stamp("MOD3_BUILD_TIME", at, TIME_FORMAT));
}
