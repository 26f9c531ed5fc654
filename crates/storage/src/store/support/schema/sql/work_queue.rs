#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS work_queue (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          work BLOB NOT NULL
        );
"#;
