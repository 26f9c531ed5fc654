#![forbid(unsafe_code)]

use wc_core::model::Md5Checksum;

#[derive(Clone, Debug)]
pub struct PristineInfo {
    pub md5_checksum: Md5Checksum,
    pub size: i64,
    pub refcount: i64,
}
