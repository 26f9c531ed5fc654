#![forbid(unsafe_code)]

mod actual;
mod conflicts;
mod core;
mod indexes;
mod locks;
mod nodes;
mod pristine;
mod work_queue;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(core::SQL);
    sql.push_str(nodes::SQL);
    sql.push_str(actual::SQL);
    sql.push_str(conflicts::SQL);
    sql.push_str(pristine::SQL);
    sql.push_str(locks::SQL);
    sql.push_str(work_queue::SQL);
    sql.push_str(indexes::SQL);
    sql
}

pub(in crate::store) use conflicts::SQL as CONFLICT_VICTIM_SQL;
