#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS lock (
          repo_id INTEGER NOT NULL,
          repos_relpath TEXT NOT NULL,
          lock_token TEXT NOT NULL,
          lock_owner TEXT,
          lock_comment TEXT,
          lock_date INTEGER,
          PRIMARY KEY (repo_id, repos_relpath)
        );

        CREATE TABLE IF NOT EXISTS wc_lock (
          wc_id INTEGER NOT NULL,
          local_dir_relpath TEXT NOT NULL,
          locked_levels INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (wc_id, local_dir_relpath)
        );
"#;
