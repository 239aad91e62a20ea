//! SQLite schema for the work corpus

/// Works, their outgoing references, and assembled decade citation edges.
/// List-valued columns hold JSON arrays.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS works (
    oa_id TEXT PRIMARY KEY,
    doi TEXT,
    title TEXT,
    publication_year INTEGER NOT NULL,
    cited_by_count INTEGER NOT NULL DEFAULT 0,
    abstract TEXT,
    referenced_works TEXT NOT NULL DEFAULT '[]',
    domain TEXT,
    field TEXT,
    topic TEXT,
    layer INTEGER NOT NULL DEFAULT 0,
    in_decade_references TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_works_year ON works(publication_year);

CREATE TABLE IF NOT EXISTS work_references (
    from_id TEXT NOT NULL REFERENCES works(oa_id) ON DELETE CASCADE,
    to_id TEXT NOT NULL,
    PRIMARY KEY (from_id, to_id)
);

CREATE INDEX IF NOT EXISTS idx_work_references_to ON work_references(to_id);

CREATE TABLE IF NOT EXISTS citation_edges (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    decade_start INTEGER NOT NULL,
    PRIMARY KEY (from_id, to_id)
);
"#;

pub const WORK_COLUMNS: &str = "oa_id, doi, title, publication_year, cited_by_count, abstract, \
     referenced_works, domain, field, topic, layer, in_decade_references";
