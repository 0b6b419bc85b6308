use goldcap::stats::market_value;

fn main() {
    env_logger::init();

    let groups = [(50_000u64, 10u64), (54_500, 15), (60_000, 5)];
    let total: u64 = groups.iter().map(|(_, quantity)| quantity).sum();
    let mv = market_value(total, groups.iter().copied());
    println!(
        "The market value of {:?} is: {:.2}",
        groups,
        mv.unwrap()
    );
}
