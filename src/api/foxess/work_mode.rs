//! The free-text `WorkMode` device setting, parsed once into [`UserMode`].

use crate::core::mode::UserMode;

/// Exact names FoxESS Cloud uses first, then a keyword guess for anything else.
pub fn parse(value: &str) -> UserMode {
    parse_strict(value).unwrap_or_else(|| parse_heuristic(value))
}

fn parse_strict(value: &str) -> Option<UserMode> {
    match value {
        "SelfUse" => Some(UserMode::SelfUse),
        "Feedin" | "FeedIn" => Some(UserMode::FeedInPriority),
        "Backup" => Some(UserMode::Backup),
        "ForceCharge" | "ForceDischarge" => Some(UserMode::Manual),
        "PeakShaving" | "TimeOfUse" => Some(UserMode::TimeOfUse),
        "OffGrid" => Some(UserMode::OffGrid),
        "Auto" | "Automatic" => Some(UserMode::Automatic),
        _ => None,
    }
}

fn parse_heuristic(value: &str) -> UserMode {
    let value = value.to_lowercase();
    if value.contains("auto") {
        UserMode::Automatic
    } else if value.contains("off") && value.contains("grid") {
        UserMode::OffGrid
    } else if value.contains("self") {
        UserMode::SelfUse
    } else if value.contains("feed") {
        UserMode::FeedInPriority
    } else if value.contains("back") {
        UserMode::Backup
    } else if value.contains("time") || value.contains("tou") || value.contains("schedul") {
        UserMode::TimeOfUse
    } else if value.contains("manual") || value.contains("force") {
        UserMode::Manual
    } else {
        UserMode::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strict() {
        assert_eq!(parse("SelfUse"), UserMode::SelfUse);
        assert_eq!(parse("Feedin"), UserMode::FeedInPriority);
        assert_eq!(parse("Backup"), UserMode::Backup);
    }

    #[test]
    fn test_parse_heuristic() {
        assert_eq!(parse("Self-use mode"), UserMode::SelfUse);
        assert_eq!(parse("feed-in first"), UserMode::FeedInPriority);
        assert_eq!(parse("Off-grid"), UserMode::OffGrid);
        assert_eq!(parse("TOU"), UserMode::TimeOfUse);
        assert_eq!(parse("automatic (EMS)"), UserMode::Automatic);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse(""), UserMode::Unknown);
        assert_eq!(parse("whatever"), UserMode::Unknown);
    }
}
