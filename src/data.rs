use self::record::VersionedRecord;

pub mod record;
pub mod table;

/// Both edit streams as read from disk. The current stream holds the observed edits, the prior
/// stream holds the version immediately preceding each of them (when it could be fetched).

#[derive(Debug, Default, Clone)]
pub struct EditStreams {
    pub current: Vec<VersionedRecord>,
    pub prior: Vec<VersionedRecord>,
}
