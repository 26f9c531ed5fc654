#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS nodes (
          wc_id INTEGER NOT NULL,
          local_relpath TEXT NOT NULL,
          op_depth INTEGER NOT NULL,
          parent_relpath TEXT,
          repos_id INTEGER,
          repos_path TEXT,
          revision INTEGER,
          presence TEXT NOT NULL,
          kind TEXT NOT NULL,
          depth TEXT,
          checksum TEXT,
          properties TEXT,
          changed_revision INTEGER,
          changed_date INTEGER,
          changed_author TEXT,
          translated_size INTEGER,
          last_mod_time INTEGER,
          symlink_target TEXT,
          dav_cache TEXT,
          moved_here INTEGER NOT NULL DEFAULT 0,
          moved_to TEXT,
          file_external INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (wc_id, local_relpath, op_depth)
        );
"#;
