//! Job model and its wire format.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A request to extract text from one or more files.
///
/// The wire format is JSON with the field names below. Paths and names are
/// carried as two parallel lists; [`Job::files`] zips them back into
/// [`FileDescriptor`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque, globally unique identifier. Also used as the message key.
    pub id: String,
    /// Creation time in epoch seconds.
    #[serde(default)]
    pub create_timestamp: i64,
    /// Absolute paths of the files to extract, in order.
    pub file_path_list: Vec<String>,
    /// Display names of the files, parallel to `file_path_list`.
    pub file_name_list: Vec<String>,
}

/// One file within a job: where it lives and what to call it in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: String,
    pub name: String,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl Job {
    /// Create a job from an ordered list of file descriptors.
    pub fn new(id: impl Into<String>, create_timestamp: i64, files: Vec<FileDescriptor>) -> Self {
        let (file_path_list, file_name_list): (Vec<String>, Vec<String>) =
            files.into_iter().map(|f| (f.path, f.name)).unzip();
        Self {
            id: id.into(),
            create_timestamp,
            file_path_list,
            file_name_list,
        }
    }

    /// Decode a job from a raw message payload.
    ///
    /// Only structural problems are reported here; list shape is checked by
    /// [`Job::validate`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Encode the job into its wire format.
    pub fn encode(&self) -> Vec<u8> {
        // A Job holds only strings and integers; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Check that paths and names pair up and that there is something to do.
    pub fn validate(&self) -> Result<()> {
        if self.file_path_list.len() != self.file_name_list.len() {
            return Err(Error::Validation(format!(
                "job {} has {} file paths but {} file names",
                self.id,
                self.file_path_list.len(),
                self.file_name_list.len()
            )));
        }
        if self.file_path_list.is_empty() {
            return Err(Error::Validation(format!("job {} has no files", self.id)));
        }
        Ok(())
    }

    /// Iterate over the job's file descriptors in order.
    pub fn files(&self) -> impl Iterator<Item = FileDescriptor> + '_ {
        self.file_path_list
            .iter()
            .zip(self.file_name_list.iter())
            .map(|(path, name)| FileDescriptor::new(path.clone(), name.clone()))
    }

    /// Number of file descriptors (assuming a valid job).
    pub fn file_count(&self) -> usize {
        self.file_path_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_file_job() -> Job {
        Job::new(
            "job_1",
            1_700_000_000,
            vec![
                FileDescriptor::new("/tmp/a.pdf", "a.pdf"),
                FileDescriptor::new("/tmp/b.pdf", "b.pdf"),
            ],
        )
    }

    #[test]
    fn test_decode_wire_format() {
        let payload = br#"{
            "id": "job_1",
            "create_timestamp": 1700000000,
            "file_path_list": ["/tmp/a.pdf", "/tmp/b.pdf"],
            "file_name_list": ["a.pdf", "b.pdf"]
        }"#;
        let job = Job::decode(payload).unwrap();
        assert_eq!(job, two_file_job());
    }

    #[test]
    fn test_decode_missing_timestamp_defaults_to_zero() {
        let payload =
            br#"{"id":"job_2","file_path_list":["/x.pdf"],"file_name_list":["x.pdf"]}"#;
        let job = Job::decode(payload).unwrap();
        assert_eq!(job.create_timestamp, 0);
    }

    #[test]
    fn test_decode_malformed() {
        let err = Job::decode(b"not json at all").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_missing_lists() {
        let err = Job::decode(br#"{"id":"job_3"}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_does_not_validate() {
        let payload = br#"{"id":"j","file_path_list":["/a.pdf","/b.pdf"],"file_name_list":["a.pdf"]}"#;
        let job = Job::decode(payload).unwrap();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_encode_uses_wire_field_names() {
        let value: serde_json::Value = serde_json::from_slice(&two_file_job().encode()).unwrap();
        assert_eq!(value["id"], "job_1");
        assert_eq!(value["create_timestamp"], 1_700_000_000);
        assert_eq!(value["file_path_list"][1], "/tmp/b.pdf");
        assert_eq!(value["file_name_list"][0], "a.pdf");
    }

    #[test]
    fn test_validate_ok() {
        assert!(two_file_job().validate().is_ok());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut job = two_file_job();
        job.file_name_list.pop();
        let err = job.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("2 file paths but 1 file names"));
    }

    #[test]
    fn test_validate_empty() {
        let job = Job::new("job_empty", 0, Vec::new());
        assert!(matches!(job.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_files_preserves_order() {
        let names: Vec<String> = two_file_job().files().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }
}
