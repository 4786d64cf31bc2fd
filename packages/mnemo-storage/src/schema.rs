//! DDL for the record table, its lexical index, and the optional vector index.
//!
//! The lexical index is an FTS5 external-content table keyed by `memories.seq`; triggers keep it
//! in the same transaction as every write to `memories`. Access bookkeeping columns are not
//! indexed, so search hits never rewrite index entries.

pub const META_VECTOR_DIM: &str = "vector_dim";

pub fn core_statements() -> &'static [&'static str] {
	&[
		"\
CREATE TABLE IF NOT EXISTS memories (
	seq INTEGER PRIMARY KEY,
	id TEXT NOT NULL UNIQUE,
	content TEXT NOT NULL,
	category TEXT NOT NULL DEFAULT 'general',
	tags TEXT NOT NULL DEFAULT '[]',
	source TEXT,
	created_at TEXT NOT NULL,
	updated_at TEXT NOT NULL,
	access_count INTEGER NOT NULL DEFAULT 0,
	last_accessed TEXT NOT NULL
)",
		"CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category)",
		"CREATE INDEX IF NOT EXISTS idx_memories_updated ON memories(updated_at)",
		"CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at)",
		"CREATE INDEX IF NOT EXISTS idx_memories_accessed ON memories(last_accessed)",
		"\
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
	id UNINDEXED,
	content,
	category UNINDEXED,
	tags,
	content = 'memories',
	content_rowid = 'seq',
	tokenize = 'porter unicode61'
)",
		"\
CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
	INSERT INTO memories_fts(rowid, id, content, category, tags)
	VALUES (new.seq, new.id, new.content, new.category, new.tags);
END",
		"\
CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
	INSERT INTO memories_fts(memories_fts, rowid, id, content, category, tags)
	VALUES ('delete', old.seq, old.id, old.content, old.category, old.tags);
END",
		"\
CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE OF id, content, category, tags ON memories BEGIN
	INSERT INTO memories_fts(memories_fts, rowid, id, content, category, tags)
	VALUES ('delete', old.seq, old.id, old.content, old.category, old.tags);
	INSERT INTO memories_fts(rowid, id, content, category, tags)
	VALUES (new.seq, new.id, new.content, new.category, new.tags);
END",
		"\
CREATE TABLE IF NOT EXISTS mnemo_meta (
	key TEXT PRIMARY KEY NOT NULL,
	value TEXT NOT NULL
)",
	]
}

pub fn vector_statements() -> &'static [&'static str] {
	&[
		"\
CREATE TABLE IF NOT EXISTS memories_vec (
	id TEXT PRIMARY KEY NOT NULL,
	embedding BLOB NOT NULL
)",
		"\
CREATE TRIGGER IF NOT EXISTS memories_vec_ad AFTER DELETE ON memories BEGIN
	DELETE FROM memories_vec WHERE id = old.id;
END",
	]
}
