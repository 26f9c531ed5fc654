#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS actual_node (
          wc_id INTEGER NOT NULL,
          local_relpath TEXT NOT NULL,
          parent_relpath TEXT,
          properties TEXT,
          changelist TEXT,
          conflict_old TEXT,
          conflict_new TEXT,
          conflict_working TEXT,
          prop_reject TEXT,
          older_checksum TEXT,
          left_checksum TEXT,
          right_checksum TEXT,
          tree_conflict_data TEXT,
          PRIMARY KEY (wc_id, local_relpath)
        );
"#;
