//! `docassist docs` — Browse the document collection without a model.

use docassist_config::AppConfig;
use docassist_tools::calculator::format_number;
use docassist_tools::{Document, DocumentStore, DocumentType};

fn print_row(doc: &Document) {
    let amount = doc
        .amount()
        .map(|a| format!("${}", format_number(a)))
        .unwrap_or_default();
    println!("  {:<8} {:<9} {:<32} {amount}", doc.id, doc.doc_type.as_str(), doc.title);
}

pub fn list() -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::sample();
    println!("📄 Documents ({})", store.len());
    println!("==============");
    for doc in store.retrieve_all() {
        print_row(doc);
    }
    Ok(())
}

pub fn search(
    query: Option<&str>,
    by: &str,
    min: Option<f64>,
    max: Option<f64>,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::sample();
    let top_k = top_k.unwrap_or_else(|| {
        AppConfig::load()
            .map(|c| c.retriever.default_top_k)
            .unwrap_or(5)
    });

    let hits = match by {
        "keyword" => {
            let query = query.ok_or("keyword search needs a query")?;
            store.retrieve_by_keyword(query, top_k)
        }
        "type" => {
            let query = query.ok_or("type search needs a document type")?;
            if DocumentType::parse(query).is_none() {
                return Err(format!("Unknown document type '{query}' (invoice, contract, report)").into());
            }
            store.retrieve_by_type(query)
        }
        "amount" => {
            if min.is_none() && max.is_none() {
                return Err("amount search needs --min and/or --max".into());
            }
            store.retrieve_by_amount_range(min, max)
        }
        other => return Err(format!("Unknown search type '{other}' (keyword, type, amount)").into()),
    };

    if hits.is_empty() {
        println!("  No documents found.");
    }
    for doc in hits {
        print_row(doc);
    }
    Ok(())
}

pub fn read(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::sample();
    let doc = store
        .get_document_by_id(id)
        .ok_or_else(|| format!("Document '{id}' not found"))?;

    println!("📄 {} — {} ({})", doc.id, doc.title, doc.doc_type);
    println!();
    println!("{}", doc.content.trim());
    if !doc.metadata.is_empty() {
        println!();
        for (key, value) in &doc.metadata {
            println!("  {key}: {}", format_number(*value));
        }
    }
    Ok(())
}

pub fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let stats = DocumentStore::sample().get_statistics();
    println!("📊 Collection Statistics");
    println!("========================");
    println!("  Documents:        {}", stats.total_documents);
    for (doc_type, count) in &stats.document_types {
        println!("    {doc_type:<10} {count}");
    }
    println!("  Invoice total:    ${}", format_number(stats.total_invoice_amount));
    println!("  Invoice average:  ${}", format_number(stats.average_invoice_amount));
    Ok(())
}
