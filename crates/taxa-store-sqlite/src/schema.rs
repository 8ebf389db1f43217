//! SQL schema for the Taxa SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Ids are hyphenated lowercase UUID strings and timestamps RFC 3339 UTC
/// strings, both generated by the store. Every parent reference cascades on
/// delete, so removing a rank removes everything beneath it.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS domains (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kingdoms (
    id          TEXT PRIMARY KEY,
    domain_id   TEXT NOT NULL REFERENCES domains(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (domain_id, name)
);

CREATE TABLE IF NOT EXISTS phyla (
    id          TEXT PRIMARY KEY,
    kingdom_id  TEXT NOT NULL REFERENCES kingdoms(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (kingdom_id, name)
);

CREATE TABLE IF NOT EXISTS classes (
    id          TEXT PRIMARY KEY,
    phylum_id   TEXT NOT NULL REFERENCES phyla(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (phylum_id, name)
);

CREATE TABLE IF NOT EXISTS orders (
    id          TEXT PRIMARY KEY,
    class_id    TEXT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (class_id, name)
);

CREATE TABLE IF NOT EXISTS families (
    id          TEXT PRIMARY KEY,
    order_id    TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (order_id, name)
);

CREATE TABLE IF NOT EXISTS genera (
    id          TEXT PRIMARY KEY,
    family_id   TEXT NOT NULL REFERENCES families(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (family_id, name)
);

CREATE TABLE IF NOT EXISTS species (
    id                      TEXT PRIMARY KEY,
    genus_id                TEXT NOT NULL REFERENCES genera(id) ON DELETE CASCADE,
    name                    TEXT NOT NULL,
    common_name             TEXT,
    description             TEXT,
    image_url               TEXT,
    distribution_map_url    TEXT,
    discovery_year          INTEGER,
    conservation_status     TEXT,
    habitat                 TEXT,
    geographic_distribution TEXT,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    UNIQUE (genus_id, name)
);

CREATE TABLE IF NOT EXISTS tags (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL
);

-- Many-to-many: species <-> tags.
CREATE TABLE IF NOT EXISTS species_tags (
    species_id TEXT NOT NULL REFERENCES species(id) ON DELETE CASCADE,
    tag_id     TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (species_id, tag_id)
);

CREATE INDEX IF NOT EXISTS kingdoms_domain_idx     ON kingdoms(domain_id);
CREATE INDEX IF NOT EXISTS phyla_kingdom_idx       ON phyla(kingdom_id);
CREATE INDEX IF NOT EXISTS classes_phylum_idx      ON classes(phylum_id);
CREATE INDEX IF NOT EXISTS orders_class_idx        ON orders(class_id);
CREATE INDEX IF NOT EXISTS families_order_idx      ON families(order_id);
CREATE INDEX IF NOT EXISTS genera_family_idx       ON genera(family_id);
CREATE INDEX IF NOT EXISTS species_genus_idx       ON species(genus_id);
CREATE INDEX IF NOT EXISTS species_tags_species_idx ON species_tags(species_id);
CREATE INDEX IF NOT EXISTS species_tags_tag_idx    ON species_tags(tag_id);

PRAGMA user_version = 1;
";
