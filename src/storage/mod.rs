//!  Storage is organized through [record_storage::RecordStorageImpl].
//!  The basic idea is:
//!   - There is a directory with all the records.
//!   - Every owner has a single file, with a json encoded work record per line.
//!   - Reads take a shared lock, modifications an exclusive one.

pub mod record_storage;
