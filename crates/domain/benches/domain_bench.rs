use std::sync::Arc;

use common::{Money, Quantity, Role, Unit};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{LogDelivery, Marketplace, MarketplaceConfig, NewProduct, Principal, SearchRequest};
use search::RankedIndex;
use store::{InMemoryMarketStore, Product};

struct Setup {
    market: Marketplace,
    seller: Principal,
    buyer: Principal,
}

async fn setup() -> Setup {
    let market = Marketplace::new(
        Arc::new(InMemoryMarketStore::new()),
        Arc::new(RankedIndex::new()),
        Arc::new(LogDelivery),
        MarketplaceConfig::default(),
    );
    let seller = market
        .register_user("bench-seller", "seller@example.com", Role::Seller)
        .await
        .unwrap();
    let buyer = market
        .register_user("bench-buyer", "buyer@example.com", Role::Buyer)
        .await
        .unwrap();
    Setup {
        market,
        seller: Principal::seller(seller.id),
        buyer: Principal::buyer(buyer.id),
    }
}

async fn list_product(setup: &Setup, name: &str, stock: i64) -> Product {
    let category = match setup.market.catalog().list_categories().await.unwrap().pop() {
        Some(category) => category,
        None => setup
            .market
            .catalog()
            .create_category("Vegetables", None)
            .await
            .unwrap(),
    };
    setup
        .market
        .catalog()
        .create_product(
            setup.seller,
            NewProduct {
                category_id: category.id,
                name: name.to_string(),
                description: "Grown without pesticides".to_string(),
                price: Money::from_cents(250),
                stock: Quantity::from_units(stock),
                unit: Unit::Kilograms,
            },
        )
        .await
        .unwrap()
}

fn bench_place_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let setup = rt.block_on(setup());
    let product = rt.block_on(list_product(&setup, "Bench Carrots", 1_000_000));

    c.bench_function("domain/place_and_cancel_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = setup
                    .market
                    .orders()
                    .place_order(setup.buyer, product.id, Quantity::from_units(1))
                    .await
                    .unwrap();
                setup
                    .market
                    .orders()
                    .cancel(setup.buyer, order.id, None)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_product(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let setup = rt.block_on(setup());
    let mut n = 0u64;

    c.bench_function("domain/create_product", |b| {
        b.iter(|| {
            n += 1;
            rt.block_on(list_product(&setup, &format!("Heirloom Tomato {n}"), 10));
        });
    });
}

fn bench_search_200_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let setup = rt.block_on(setup());
    rt.block_on(async {
        for i in 0..200 {
            list_product(&setup, &format!("Sweet Pepper {i}"), 5).await;
        }
    });

    c.bench_function("domain/search_200_products", |b| {
        b.iter(|| {
            rt.block_on(async {
                setup
                    .market
                    .search()
                    .search(SearchRequest::text("sweet pepper"))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_place_and_cancel,
    bench_create_product,
    bench_search_200_products
);
criterion_main!(benches);
