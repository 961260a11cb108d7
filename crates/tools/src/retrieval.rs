//! Simulated document retriever.
//!
//! A fixed, read-only corpus of business documents with keyword, type and
//! amount lookups. Stands in for a real search index: results come back in
//! corpus order and nothing is ever written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Contract,
    Report,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Contract => "contract",
            Self::Report => "report",
        }
    }

    /// Exact match on the category name.
    pub fn parse(s: &str) -> Option<Self> {
        [Self::Invoice, Self::Contract, Self::Report]
            .into_iter()
            .find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single document in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub doc_type: DocumentType,
    pub content: String,
    /// Numeric facts about the document, e.g. `amount`
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
}

impl Document {
    fn new(
        id: &str,
        title: &str,
        doc_type: DocumentType,
        content: &str,
        metadata: &[(&str, f64)],
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            doc_type,
            content: content.into(),
            metadata: metadata.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    /// The `amount` metadata field, if present.
    pub fn amount(&self) -> Option<f64> {
        self.metadata.get("amount").copied()
    }

    fn mentions(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
    }
}

/// Aggregate figures over the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_documents: usize,
    pub document_types: BTreeMap<String, usize>,
    pub total_invoice_amount: f64,
    pub average_invoice_amount: f64,
}

/// The immutable document collection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// The built-in sample corpus: two invoices, one contract, two reports.
    pub fn sample() -> Self {
        Self::new(sample_documents())
    }

    /// Every document, in corpus order.
    pub fn retrieve_all(&self) -> &[Document] {
        &self.documents
    }

    /// Case-insensitive substring match over title and content.
    pub fn retrieve_by_keyword(&self, query: &str, top_k: usize) -> Vec<&Document> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.documents
            .iter()
            .filter(|d| d.mentions(&needle))
            .take(top_k)
            .collect()
    }

    /// All documents of the named type. Unknown type names match nothing.
    pub fn retrieve_by_type(&self, doc_type: &str) -> Vec<&Document> {
        let Some(wanted) = DocumentType::parse(doc_type) else {
            return Vec::new();
        };
        self.documents
            .iter()
            .filter(|d| d.doc_type == wanted)
            .collect()
    }

    /// Documents whose `amount` lies within the inclusive bounds.
    /// Documents without an amount never match.
    pub fn retrieve_by_amount_range(&self, min: Option<f64>, max: Option<f64>) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|d| match d.amount() {
                Some(amount) => {
                    min.is_none_or(|lo| amount >= lo) && max.is_none_or(|hi| amount <= hi)
                }
                None => false,
            })
            .collect()
    }

    /// Exact id lookup (case-insensitive).
    pub fn get_document_by_id(&self, id: &str) -> Option<&Document> {
        let id = id.trim();
        self.documents.iter().find(|d| d.id.eq_ignore_ascii_case(id))
    }

    pub fn get_statistics(&self) -> DocumentStats {
        let mut document_types = BTreeMap::new();
        for doc in &self.documents {
            *document_types.entry(doc.doc_type.as_str().to_string()).or_insert(0) += 1;
        }

        let invoice_amounts: Vec<f64> = self
            .documents
            .iter()
            .filter(|d| d.doc_type == DocumentType::Invoice)
            .filter_map(Document::amount)
            .collect();
        let total_invoice_amount: f64 = invoice_amounts.iter().sum();
        let average_invoice_amount = if invoice_amounts.is_empty() {
            0.0
        } else {
            total_invoice_amount / invoice_amounts.len() as f64
        };

        DocumentStats {
            total_documents: self.documents.len(),
            document_types,
            total_invoice_amount,
            average_invoice_amount,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::sample()
    }
}

fn sample_documents() -> Vec<Document> {
    vec![
        Document::new(
            "INV-001",
            "Invoice #12345",
            DocumentType::Invoice,
            "Invoice #12345\n\
             Date: 2024-01-15\n\
             Client: Acme Corporation\n\
             \n\
             Services:\n\
             - Software development (120 hours @ $150/hr): $18,000\n\
             - Technical consulting (20 hours @ $100/hr): $2,000\n\
             \n\
             Subtotal: $20,000\n\
             Tax (10%): $2,000\n\
             Total Amount: $22,000\n\
             \n\
             Payment terms: Net 30 days",
            &[("amount", 22_000.0), ("subtotal", 20_000.0), ("tax", 2_000.0)],
        ),
        Document::new(
            "INV-002",
            "Invoice #12346",
            DocumentType::Invoice,
            "Invoice #12346\n\
             Date: 2024-02-20\n\
             Client: TechStart Inc.\n\
             \n\
             Services:\n\
             - Cloud infrastructure setup: $45,000\n\
             - Annual support package: $18,000\n\
             \n\
             Subtotal: $63,000\n\
             Tax (10%): $6,300\n\
             Total Amount: $69,300\n\
             \n\
             Payment terms: Net 45 days",
            &[("amount", 69_300.0), ("subtotal", 63_000.0), ("tax", 6_300.0)],
        ),
        Document::new(
            "CON-001",
            "Service Agreement",
            DocumentType::Contract,
            "Service Agreement between DocuCorp Ltd. and Healthcare Plus\n\
             Effective date: 2024-01-01\n\
             Term: 12 months\n\
             \n\
             Scope: managed document processing and records digitisation.\n\
             Monthly service fee: $16,500, invoiced monthly in advance.\n\
             One-time onboarding fee: $16,500.\n\
             Total contract value: $214,500\n\
             \n\
             Either party may terminate with 60 days written notice.\n\
             Service level: 99.5% availability, 4-hour response for critical issues.",
            &[("amount", 214_500.0), ("monthly_fee", 16_500.0), ("term_months", 12.0)],
        ),
        Document::new(
            "RPT-001",
            "Q1 2024 Financial Report",
            DocumentType::Report,
            "Q1 2024 Financial Report\n\
             \n\
             Revenue: $450,000 (up 15% quarter over quarter)\n\
             Operating expenses: $310,000\n\
             Net profit: $140,000\n\
             \n\
             Accounts receivable: two open invoices (INV-001, INV-002) totalling $91,300.\n\
             Largest new commitment: the Healthcare Plus service agreement (CON-001).\n\
             Outlook: continued growth in cloud services revenue.",
            &[("revenue", 450_000.0), ("expenses", 310_000.0), ("profit", 140_000.0)],
        ),
        Document::new(
            "RPT-002",
            "2023 Annual Operations Report",
            DocumentType::Report,
            "2023 Annual Operations Report\n\
             \n\
             Documents processed: 48,000\n\
             Average invoice processing time fell from 6 days to 3 days after\n\
             the new approval workflow went live in Q3.\n\
             Customer satisfaction: 4.6 / 5\n\
             Headcount at year end: 42\n\
             \n\
             Priorities for 2024: automate contract renewals and reduce\n\
             invoice disputes below 2%.",
            &[("documents_processed", 48_000.0), ("headcount", 42.0)],
        ),
    ]
}
