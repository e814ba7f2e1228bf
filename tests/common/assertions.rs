/// Argument-level assertions for rendered ffmpeg invocations.
///
/// These work on the argument vector rather than a joined string so that
/// `-b:v` never matches inside `-b:v:0` and paths with spaces stay whole.

#[allow(dead_code)]
pub fn assert_has_arg(args: &[String], arg: &str) {
    assert!(
        args.iter().any(|a| a == arg),
        "Expected ffmpeg args to contain '{}' but they didn't.\nArgs: {}",
        arg,
        args.join(" ")
    );
}

#[allow(dead_code)]
pub fn assert_lacks_arg(args: &[String], arg: &str) {
    assert!(
        !args.iter().any(|a| a == arg),
        "Expected ffmpeg args to NOT contain '{}' but they did.\nArgs: {}",
        arg,
        args.join(" ")
    );
}

/// Value following `flag`, e.g. "23" for `-crf 23`
#[allow(dead_code)]
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

#[allow(dead_code)]
pub fn assert_flag_value(args: &[String], flag: &str, expected: &str) {
    match flag_value(args, flag) {
        Some(value) => assert_eq!(
            value, expected,
            "Expected {} {} but got {}",
            flag, expected, value
        ),
        None => panic!("Flag '{}' not found in args: {}", flag, args.join(" ")),
    }
}

/// `first` appears before `second`
#[allow(dead_code)]
pub fn assert_before(args: &[String], first: &str, second: &str) {
    let pos = |needle: &str| {
        args.iter()
            .position(|a| a == needle)
            .unwrap_or_else(|| panic!("'{}' not found in args: {}", needle, args.join(" ")))
    };
    assert!(
        pos(first) < pos(second),
        "Expected '{}' before '{}' in args: {}",
        first,
        second,
        args.join(" ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_flag_value() {
        let a = args("-i input.mp4 -crf 30 -b:v 2000k output.mkv");
        assert_eq!(flag_value(&a, "-crf"), Some("30"));
        assert_eq!(flag_value(&a, "-b:v"), Some("2000k"));
        assert_eq!(flag_value(&a, "-nonexistent"), None);
    }

    #[test]
    #[should_panic(expected = "Expected ffmpeg args to contain")]
    fn test_assert_has_arg_fails() {
        assert_has_arg(&args("-i input.mp4"), "-nonexistent");
    }
}
