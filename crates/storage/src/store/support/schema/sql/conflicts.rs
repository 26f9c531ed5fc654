#![forbid(unsafe_code)]

pub(in crate::store) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS conflict_victim (
          wc_id INTEGER NOT NULL,
          local_relpath TEXT NOT NULL,
          parent_relpath TEXT,
          operation TEXT NOT NULL,
          action TEXT NOT NULL,
          reason TEXT NOT NULL,
          node_kind TEXT NOT NULL,
          left_repos_relpath TEXT,
          left_revision INTEGER,
          left_kind TEXT,
          right_repos_relpath TEXT,
          right_revision INTEGER,
          right_kind TEXT,
          PRIMARY KEY (wc_id, local_relpath)
        );

        CREATE INDEX IF NOT EXISTS idx_conflict_victim_parent
          ON conflict_victim (wc_id, parent_relpath);
"#;
