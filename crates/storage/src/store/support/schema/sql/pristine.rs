#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS pristine (
          checksum TEXT PRIMARY KEY,
          md5_checksum TEXT NOT NULL,
          size INTEGER NOT NULL,
          refcount INTEGER NOT NULL
        );
"#;
