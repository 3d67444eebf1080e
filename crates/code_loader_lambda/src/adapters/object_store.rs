use std::path::Path;

pub trait CodeStore {
    /// Downloads `bucket/key` to `destination`, overwriting whatever is there.
    fn download_object(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), String>;
}
