use chrono::{Duration, Utc};
use common::{CategoryId, Money, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use search::{RankedIndex, SearchDocument, SearchFilters, SearchIndex, SubstringIndex};

const NAMES: [&str; 8] = [
    "Sweet Corn",
    "Basmati Rice",
    "Red Tomatoes",
    "Organic Carrots",
    "Black Beans",
    "Rolled Oats",
    "Sweet Potatoes",
    "Fresh Strawberries",
];

fn documents(n: usize) -> Vec<SearchDocument> {
    let categories = [CategoryId::new(), CategoryId::new(), CategoryId::new()];
    let now = Utc::now();
    (0..n)
        .map(|i| SearchDocument {
            product_id: ProductId::new(),
            name: format!("{} lot {i}", NAMES[i % NAMES.len()]),
            description: "Harvested this week from a family farm, sold by the kilogram".to_string(),
            category_id: categories[i % categories.len()],
            category_name: ["Grains", "Vegetables", "Fruit"][i % 3].to_string(),
            price: Money::from_cents(100 + (i as i64 % 900)),
            available: i % 7 != 0,
            created_at: now - Duration::minutes(i as i64),
            updated_at: now - Duration::minutes(i as i64),
        })
        .collect()
}

async fn populate(index: &dyn SearchIndex, n: usize) {
    for doc in documents(n) {
        index.reindex(doc).await.unwrap();
    }
}

fn bench_ranked_query_1000_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let index = RankedIndex::new();
    rt.block_on(populate(&index, 1000));
    let filters = SearchFilters::new()
        .available(true)
        .max_price(Money::from_cents(500));

    c.bench_function("search/ranked_query_1000_products", |b| {
        b.iter(|| {
            rt.block_on(async {
                index.query("sweet farm", &filters).await.unwrap();
            });
        });
    });
}

fn bench_substring_query_1000_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let index = SubstringIndex::new();
    rt.block_on(populate(&index, 1000));
    let filters = SearchFilters::new().available(true);

    c.bench_function("search/substring_query_1000_products", |b| {
        b.iter(|| {
            rt.block_on(async {
                index.query("sweet", &filters).await.unwrap();
            });
        });
    });
}

fn bench_reindex(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let index = RankedIndex::new();
    let docs = documents(100);

    c.bench_function("search/reindex_100_products", |b| {
        b.iter(|| {
            rt.block_on(async {
                for doc in &docs {
                    index.reindex(doc.clone()).await.unwrap();
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_ranked_query_1000_products,
    bench_substring_query_1000_products,
    bench_reindex
);
criterion_main!(benches);
