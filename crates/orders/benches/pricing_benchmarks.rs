use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use larder_catalog::{Discount, Product};
use larder_core::{OrderId, OrderItemId, ProductId};
use larder_orders::{Order, OrderItem, ServiceType, price_order};

fn build_order(lines: usize) -> (Order, Vec<OrderItem>, Vec<Product>) {
    let order_id = OrderId::new();
    let order = Order::new(order_id, ServiceType::DineIn)
        .with_discount(Discount::Percentage(Decimal::new(5, 0)));

    let mut items = Vec::with_capacity(lines);
    let mut products = Vec::with_capacity(lines);
    for i in 0..lines {
        let product_id = ProductId::new();
        let price = Decimal::new(850 + i as i64, 2);
        products.push(Product::new(product_id, format!("Dish {i}"), price));
        items.push(
            OrderItem::new(OrderItemId::new(), order_id, product_id, price, 2)
                .with_discount(Discount::Percentage(Decimal::new(3, 0))),
        );
    }

    (order, items, products)
}

fn bench_price_order(c: &mut Criterion) {
    for lines in [5usize, 50] {
        let (order, items, products) = build_order(lines);
        let line_refs: Vec<(&OrderItem, &Product)> =
            items.iter().zip(products.iter()).collect();

        c.bench_function(&format!("price_order/{lines}_lines"), |b| {
            b.iter(|| {
                let (totals, _) = price_order(black_box(&order), black_box(&line_refs), &[]);
                totals
            })
        });
    }
}

criterion_group!(benches, bench_price_order);
criterion_main!(benches);
