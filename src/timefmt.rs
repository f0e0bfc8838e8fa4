//! Pure display formatting for countdowns, waits, addresses and ETH amounts.

/// Session countdowns render as `HH:MM:SS`, clamped at zero.
pub fn format_clock(seconds: i64) -> String {
    if seconds <= 0 {
        return "00:00:00".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Cooldown waits (milliseconds) render with the two most significant units.
pub fn format_wait(ms: i64) -> String {
    if ms <= 0 {
        return "Available".to_string();
    }
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Dust amounts get more precision so the check-in cost never rounds to zero.
pub fn format_eth(amount: f64) -> String {
    if amount <= 0.0 {
        return "0 ETH".to_string();
    }
    if amount < 0.00001 {
        format!("{:.8} ETH", amount)
    } else {
        format!("{:.6} ETH", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_clamps_at_zero() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(-5), "00:00:00");
    }

    #[test]
    fn clock_pads_fields() {
        assert_eq!(format_clock(7190), "01:59:50");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(2 * 3600), "02:00:00");
    }

    #[test]
    fn wait_picks_significant_units() {
        assert_eq!(format_wait(0), "Available");
        assert_eq!(format_wait(-1), "Available");
        assert_eq!(format_wait(2 * 3_600_000 + 5 * 60_000), "2h 5m");
        assert_eq!(format_wait(5 * 60_000 + 3_000), "5m 3s");
        assert_eq!(format_wait(45_000), "45s");
        assert_eq!(format_wait(999), "0s");
    }

    #[test]
    fn address_shortening() {
        assert_eq!(
            shorten_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(shorten_address("0xshort"), "0xshort");
        assert_eq!(shorten_address(""), "");
    }

    #[test]
    fn eth_formatting_scales_precision() {
        assert_eq!(format_eth(0.0), "0 ETH");
        assert_eq!(format_eth(0.000005), "0.00000500 ETH");
        assert_eq!(format_eth(0.5), "0.500000 ETH");
    }
}
