//! In-memory `.tgz` bundles.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::station::Station;

/// Builds a gzipped tar archive from named members.
#[derive(Debug, Default, Clone)]
pub struct TgzBuilder {
    members: Vec<(String, Vec<u8>)>,
}

impl TgzBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.members.push((path.to_string(), contents.into()));
        self
    }

    pub fn json(self, path: &str, document: &Value) -> Self {
        let contents = serde_json::to_vec_pretty(document).expect("fixture JSON serializes");
        self.file(path, contents)
    }

    /// Add a station document under its BOM member name.
    pub fn station(self, product: &str, station: &Station) -> Self {
        let name = station.member_name(product);
        self.json(&name, &station.to_json())
    }

    pub fn build(&self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, contents) in &self.members {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_709_269_200);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_slice())
                .expect("append tar member");
        }

        builder
            .into_inner()
            .and_then(|encoder| encoder.finish())
            .expect("finish tgz")
    }
}
