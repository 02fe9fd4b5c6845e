//! Prepared mutation statements keyed by the set of fields they write.
//!
//! Statements live in an arena and are addressed by [`StatementId`]. Two
//! indexes map a canonical [`FieldSetKey`] to an id, one for insert-shaped and
//! one for update-shaped statements. Entries are never evicted; the number of
//! distinct field sets is bounded by the schema.

use ahash::AHashMap;
use tracing::debug;

use crate::{batch::PendingBatch, connection::SqlConnection, errors::SqlKvError, sql};

const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
}

/// Order-independent identity of a field set: the sorted names joined by a
/// unit separator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldSetKey(String);

impl FieldSetKey {
    /// Sorted, de-duplicated field names. This is the order used both for the
    /// SQL column list and for parameter binding.
    pub fn canonical_fields<'a, I>(names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields: Vec<String> = names.into_iter().map(str::to_string).collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    pub fn from_canonical(fields: &[String]) -> Self {
        let mut key = String::new();
        for (idx, field) in fields.iter().enumerate() {
            if idx > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(field);
        }
        FieldSetKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(usize);

impl StatementId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct CachedStatement<H> {
    kind: StatementKind,
    fields: Vec<String>,
    handle: H,
    pub(crate) batch: PendingBatch,
}

impl<H> CachedStatement<H> {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Field order fixed at preparation time.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn pending_count(&self) -> usize {
        self.batch.len()
    }
}

pub struct StatementCache<H> {
    table: String,
    key_field: String,
    statements: Vec<CachedStatement<H>>,
    inserts: AHashMap<FieldSetKey, StatementId>,
    updates: AHashMap<FieldSetKey, StatementId>,
}

impl<H> StatementCache<H> {
    pub fn new<T: Into<String>, K: Into<String>>(table: T, key_field: K) -> Self {
        Self {
            table: table.into(),
            key_field: key_field.into(),
            statements: Vec::new(),
            inserts: AHashMap::new(),
            updates: AHashMap::new(),
        }
    }

    /// Returns the statement for `kind` and this field set, preparing it on
    /// first use.
    pub fn get_or_create<'a, C, I>(
        &mut self,
        conn: &mut C,
        kind: StatementKind,
        names: I,
    ) -> Result<StatementId, SqlKvError>
    where
        C: SqlConnection<Handle = H>,
        I: IntoIterator<Item = &'a str>,
    {
        let fields = FieldSetKey::canonical_fields(names);
        let key = FieldSetKey::from_canonical(&fields);
        if let Some(id) = self.index(kind).get(&key) {
            return Ok(*id);
        }
        let text = match kind {
            StatementKind::Insert => sql::insert_sql(&self.table, &self.key_field, &fields),
            StatementKind::Update => sql::update_sql(&self.table, &self.key_field, &fields),
        };
        let handle = conn.prepare(&text)?;
        let id = StatementId(self.statements.len());
        debug!(?kind, fields = key.as_str(), id = id.0, "cached new statement");
        self.statements.push(CachedStatement {
            kind,
            fields,
            handle,
            batch: PendingBatch::default(),
        });
        self.index_mut(kind).insert(key, id);
        Ok(id)
    }

    pub fn lookup<'a, I>(&self, kind: StatementKind, names: I) -> Option<StatementId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields = FieldSetKey::canonical_fields(names);
        self.index(kind)
            .get(&FieldSetKey::from_canonical(&fields))
            .copied()
    }

    pub fn get(&self, id: StatementId) -> &CachedStatement<H> {
        &self.statements[id.0]
    }

    pub fn get_mut(&mut self, id: StatementId) -> &mut CachedStatement<H> {
        &mut self.statements[id.0]
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements currently holding unsent rows. Never more than one.
    pub fn pending_statements(&self) -> usize {
        self.statements
            .iter()
            .filter(|cs| cs.pending_count() > 0)
            .count()
    }

    fn index(&self, kind: StatementKind) -> &AHashMap<FieldSetKey, StatementId> {
        match kind {
            StatementKind::Insert => &self.inserts,
            StatementKind::Update => &self.updates,
        }
    }

    fn index_mut(&mut self, kind: StatementKind) -> &mut AHashMap<FieldSetKey, StatementId> {
        match kind {
            StatementKind::Insert => &mut self.inserts,
            StatementKind::Update => &mut self.updates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_order_and_duplicates() {
        let a = FieldSetKey::canonical_fields(["field2", "field0", "field1"]);
        let b = FieldSetKey::canonical_fields(["field1", "field2", "field0", "field1"]);
        assert_eq!(a, vec!["field0", "field1", "field2"]);
        assert_eq!(FieldSetKey::from_canonical(&a), FieldSetKey::from_canonical(&b));
    }

    #[test]
    fn test_key_does_not_collide_on_concatenation() {
        let a = FieldSetKey::from_canonical(&FieldSetKey::canonical_fields(["ab", "c"]));
        let b = FieldSetKey::from_canonical(&FieldSetKey::canonical_fields(["a", "bc"]));
        assert_ne!(a, b);
    }
}
