#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS repository (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          root TEXT UNIQUE NOT NULL,
          uuid TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wcroot (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          local_abspath TEXT UNIQUE
        );
"#;
