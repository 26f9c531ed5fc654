#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_nodes_effective
          ON nodes (wc_id, local_relpath, op_depth DESC);
        CREATE INDEX IF NOT EXISTS idx_nodes_parent
          ON nodes (wc_id, parent_relpath, op_depth);
        CREATE INDEX IF NOT EXISTS idx_actual_parent
          ON actual_node (wc_id, parent_relpath);
        CREATE INDEX IF NOT EXISTS idx_pristine_md5
          ON pristine (md5_checksum);
"#;
