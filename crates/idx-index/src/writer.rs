//! External index writer (C7's sink): wraps Tantivy behind the narrow
//! "accepts a schema, accepts documents, accepts terms" contract described
//! for the external inverted-index collaborator.

use std::{fs, path::Path};

use tantivy::{
    Index, IndexWriter as TantivyIndexWriter, TantivyDocument,
    directory::MmapDirectory,
    schema::{FAST, Field, STORED, STRING, Schema, TextFieldIndexing, TextOptions},
};

use crate::{
    analyzer::{TEXT_TOKENIZER, build_analyzer_from_name},
    error::IndexError,
    indexer::IndexedDocument,
};

const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// Field handles for the generalized document shape emitted by the
/// indexing driver: a document id, a bag of exact-match terms (keyword,
/// bucket, and geo-fingerprint terms alike), an analyzed text body for
/// `text`-typed fields, sortable byte values per slot, and one JSON blob
/// of stored leaf values.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    schema: Schema,
    /// The document's resolved id term.
    pub id: Field,
    /// Exact-match terms: keyword values, accuracy buckets, geo fingerprints.
    pub terms: Field,
    /// Analyzed text, one value per `text`-typed leaf.
    pub body: Field,
    /// Sortable byte encodings, one value per indexed scalar leaf.
    pub values: Field,
    /// A JSON-encoded blob of the document's stored leaf values.
    pub data: Field,
}

impl IndexSchema {
    /// Builds the fixed field set.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let id = builder.add_text_field("id", STRING | STORED | FAST);

        let term_options = TextOptions::default()
            .set_indexing_options(TextFieldIndexing::default().set_tokenizer("raw"))
            .set_stored();
        let terms = builder.add_text_field("terms", term_options);

        let body_options = TextOptions::default()
            .set_indexing_options(TextFieldIndexing::default().set_tokenizer(TEXT_TOKENIZER))
            .set_stored();
        let body = builder.add_text_field("body", body_options);

        let values = builder.add_bytes_field("values", STORED);
        let data = builder.add_bytes_field("data", STORED);

        let schema = builder.build();

        Self { schema, id, terms, body, values, data }
    }

    /// The underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes [`IndexedDocument`]s produced by the indexing driver into the
/// external index.
pub struct IndexWriter {
    writer: TantivyIndexWriter,
    schema: IndexSchema,
}

impl IndexWriter {
    /// Opens or creates an index at `path`, registering the text analyzer
    /// for the configured language.
    pub fn open(path: &Path, language: &str) -> Result<Self, IndexError> {
        let schema = IndexSchema::new();
        fs::create_dir_all(path)?;

        let index = Self::open_or_recreate_index(path, &schema)?;

        let analyzer = build_analyzer_from_name(language)?;
        index.tokenizers().register(TEXT_TOKENIZER, analyzer);

        let writer =
            index.writer(DEFAULT_HEAP_SIZE).map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        Ok(Self { writer, schema })
    }

    fn open_or_recreate_index(path: &Path, schema: &IndexSchema) -> Result<Index, IndexError> {
        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;

        match Index::open_or_create(dir, schema.schema().clone()) {
            Ok(index) => Ok(index),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("schema does not match") || error_msg.contains("Schema error") {
                    Self::delete_index_files(path)?;
                    fs::create_dir_all(path)?;
                    let dir = MmapDirectory::open(path).map_err(|e| {
                        let err: tantivy::TantivyError = e.into();
                        IndexError::open_index(path.to_path_buf(), &err)
                    })?;
                    Index::open_or_create(dir, schema.schema().clone())
                        .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))
                } else {
                    Err(IndexError::open_index(path.to_path_buf(), &e))
                }
            }
        }
    }

    fn delete_index_files(path: &Path) -> Result<(), IndexError> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    /// Adds one indexed document, staged until [`commit`](Self::commit).
    #[allow(clippy::needless_pass_by_ref_mut)]
    pub fn add_document(&mut self, doc: &IndexedDocument) -> Result<(), IndexError> {
        let mut tantivy_doc = TantivyDocument::new();
        tantivy_doc.add_text(self.schema.id, &doc.id_term);

        for term in &doc.terms {
            tantivy_doc.add_text(self.schema.terms, term);
        }
        for text in &doc.text_values {
            tantivy_doc.add_text(self.schema.body, text);
        }
        for value in &doc.sortable_values {
            tantivy_doc.add_bytes(self.schema.values, value.clone());
        }
        tantivy_doc.add_bytes(self.schema.data, doc.stored_data.clone());

        self.writer.add_document(tantivy_doc).map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Adds multiple documents.
    pub fn add_documents(&mut self, docs: &[IndexedDocument]) -> Result<(), IndexError> {
        for doc in docs {
            self.add_document(doc)?;
        }
        Ok(())
    }

    /// Deletes every document carrying the given id term.
    #[allow(clippy::needless_pass_by_ref_mut)]
    pub fn delete_by_id(&mut self, id_term: &str) {
        let term = tantivy::Term::from_field_text(self.schema.id, id_term);
        self.writer.delete_term(term);
    }

    /// Commits all pending changes, making them visible to readers.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.writer.commit().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Rolls back any uncommitted changes.
    #[cfg(test)]
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Deletes all documents from the index.
    #[allow(clippy::needless_pass_by_ref_mut)]
    pub fn delete_all(&mut self) -> Result<(), IndexError> {
        self.writer.delete_all_documents().map_err(|e| IndexError::write(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use tantivy::Index;
    use tempfile::TempDir;

    use super::*;

    fn num_docs_in_dir(path: &Path) -> u64 {
        let index = Index::open_in_dir(path).unwrap();
        let reader = index.reader().unwrap();
        reader.searcher().num_docs()
    }

    fn sample_doc() -> IndexedDocument {
        IndexedDocument {
            id_term: "Qabc123".to_string(),
            terms: vec!["title:hello".to_string(), "age:100".to_string()],
            text_values: vec!["hello world".to_string()],
            sortable_values: vec![vec![0, 0, 0, 0, 0, 0, 0, 42]],
            stored_data: b"{}".to_vec(),
        }
    }

    #[test]
    fn creates_index_in_empty_directory() {
        let temp = TempDir::new().unwrap();
        let writer = IndexWriter::open(temp.path(), "english").unwrap();
        assert!(temp.path().join("meta.json").exists());
        drop(writer);
    }

    #[test]
    fn adds_and_commits_document() {
        let temp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(temp.path(), "english").unwrap();

        writer.add_document(&sample_doc()).unwrap();
        writer.commit().unwrap();

        assert_eq!(num_docs_in_dir(temp.path()), 1);
    }

    #[test]
    fn reopens_existing_index() {
        let temp = TempDir::new().unwrap();
        {
            let mut writer = IndexWriter::open(temp.path(), "english").unwrap();
            writer.add_document(&sample_doc()).unwrap();
            writer.commit().unwrap();
        }
        {
            let writer = IndexWriter::open(temp.path(), "english").unwrap();
            assert_eq!(num_docs_in_dir(temp.path()), 1);
            drop(writer);
        }
    }

    #[test]
    fn delete_all_removes_documents() {
        let temp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(temp.path(), "english").unwrap();

        writer.add_document(&sample_doc()).unwrap();
        writer.commit().unwrap();
        writer.delete_all().unwrap();
        writer.commit().unwrap();

        assert_eq!(num_docs_in_dir(temp.path()), 0);
    }

    #[test]
    fn rollback_discards_uncommitted_changes() {
        let temp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(temp.path(), "english").unwrap();

        writer.add_document(&sample_doc()).unwrap();
        writer.rollback().unwrap();
        writer.commit().unwrap();

        assert_eq!(num_docs_in_dir(temp.path()), 0);
    }

    #[test]
    fn delete_by_id_removes_matching_documents() {
        let temp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(temp.path(), "english").unwrap();

        writer.add_document(&sample_doc()).unwrap();
        writer.commit().unwrap();

        writer.delete_by_id("Qabc123");
        writer.commit().unwrap();

        assert_eq!(num_docs_in_dir(temp.path()), 0);
    }
}
