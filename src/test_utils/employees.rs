//! Sample directory records.
use crate::credential::EmployeeRecord;

/// A plain ASCII record.
pub fn ada() -> EmployeeRecord {
    EmployeeRecord::new("1001", "Ada Lovelace", "+44 20 7946 0018", "ada@example.com")
}

/// Records covering characters that need escaping or multi-byte encoding.
pub fn directory() -> Vec<EmployeeRecord> {
    vec![
        ada(),
        EmployeeRecord::new("1002", "Grace \"Amazing\" Hopper", "555-0100", "grace@example.com"),
        EmployeeRecord::new("1003", "Zoë Ångström", "+46 8 123 456", "zoe@example.se"),
        EmployeeRecord::new("1004", "山田 太郎", "03-1234-5678", "taro@example.jp"),
        EmployeeRecord::new("1005", "Back\\slash\nNewline", "", "edge@example.com"),
    ]
}
