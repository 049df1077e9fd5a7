use simplelog::*;

use rhythmtree::{prelude::*, time::events_to_f64};

// -------------------------------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // init logging
    TermLogger::init(
        log::STATIC_MAX_LEVEL,
        ConfigBuilder::default().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|err| {
        log::error!("init_logger error: {:?}", err);
    });

    // quantize a loosely played bar with a flam on the first beat, or a grammar given as arg
    let grammar = match std::env::args().nth(1) {
        Some(path) => Grammar::from_file(path)?,
        None => default_grammar().clone(),
    };
    let points = [0.0, 0.03, 0.98, 1.52, 2.04, 3.01];
    let notes = vec![Label::Note; points.len()];
    let quantizer = Quantizer::new(&grammar)
        .with_interval(Interval::new(0.0, 4.0))
        .with_count(5);
    for (rank, result) in quantizer.quantize(&points, &notes).enumerate() {
        let events = result.tree.to_events(Fraction::from(0), Fraction::from(4));
        println!(
            "#{} cost {:.3}: {} -> {:?} (points {:?})",
            rank,
            result.cost,
            result.tree,
            events_to_f64(&events),
            result.indices
        );
    }

    // simplify a measure tree with the cost driven rewrite walk
    let tree = Tree::from_string("22ns22sr2nn").ok_or_else(|| anyhow::anyhow!("invalid tree"))?;
    println!("{} normalizes to {}", tree, normalize(&tree));

    // euclidean rhythms
    let rhythm = parse_rhythm("euclidean 5 8 0")?;
    let steps = rhythm
        .pattern()
        .iter()
        .map(|pulse| if *pulse { 'x' } else { '.' })
        .collect::<String>();
    println!("{}: {}", rhythm, steps);
    Ok(())
}
