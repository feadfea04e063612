#![no_main]

use fixflow_rules::text::TextTree;
use fixflow_types::PreprocessorConfiguration;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else { return };

    let cfg = PreprocessorConfiguration::from_symbols(vec!["DEBUG".to_string()]);
    let Ok(tree) = TextTree::parse(s, &cfg) else { return };

    let mut offset = 0;
    for line in tree.lines() {
        assert_eq!(line.start, offset);
        assert!(line.start <= line.end && line.end <= line.next);
        assert_eq!(line.code(s).len(), line.end - line.start);
        offset = line.next;
    }
    assert_eq!(offset, s.len());
});
