use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rust_decimal::Decimal;
use wareflow_availability::AdjustedStock;
use wareflow_core::{CompanyId, ProductId};
use wareflow_stock::{AvailabilityContext, Location, LocationUsage, Quant};

/// A stack with `products` products spread over a stock location and a
/// quality hold; the hold is flagged when `flagged` is set.
fn seeded_stack(products: usize, flagged: bool) -> (AdjustedStock, Vec<ProductId>, CompanyId) {
    let stack = AdjustedStock::new();
    let company = CompanyId::new();
    let stock = stack
        .locations()
        .insert(Location::new(company, "Stock", LocationUsage::Internal));
    let hold = stack
        .locations()
        .insert(Location::new(company, "Quality hold", LocationUsage::Internal));

    let ids: Vec<ProductId> = (0..products).map(|_| ProductId::new()).collect();
    for product_id in &ids {
        stack
            .quants()
            .insert(Quant::new(company, *product_id, stock, Decimal::from(25)));
        stack
            .quants()
            .insert(Quant::new(company, *product_id, hold, Decimal::from(5)));
    }
    if flagged {
        stack.locations().set_exclusion_flag(hold, true).unwrap();
    }
    (stack, ids, company)
}

fn bench_available_quantities(c: &mut Criterion) {
    let mut group = c.benchmark_group("available_quantities");

    for products in [10usize, 100] {
        group.throughput(Throughput::Elements(products as u64));

        let (stack, ids, company) = seeded_stack(products, false);
        let ctx = AvailabilityContext::for_companies(vec![company]);
        group.bench_with_input(
            BenchmarkId::new("baseline", products),
            &products,
            |b, _| {
                b.iter(|| {
                    black_box(stack.baseline_quantities(&ids, &ctx).unwrap());
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("adjusted_no_exclusion", products),
            &products,
            |b, _| {
                b.iter(|| {
                    black_box(stack.available_quantities(&ids, &ctx).unwrap());
                })
            },
        );

        let (stack, ids, company) = seeded_stack(products, true);
        let ctx = AvailabilityContext::for_companies(vec![company]);
        group.bench_with_input(
            BenchmarkId::new("adjusted_with_exclusion", products),
            &products,
            |b, _| {
                b.iter(|| {
                    black_box(stack.available_quantities(&ids, &ctx).unwrap());
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_available_quantities);
criterion_main!(benches);
