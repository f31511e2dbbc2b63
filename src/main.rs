use anyhow::Result;
use clap::Parser;
use log::info;
use std::time::Duration;

use airfield_sim::simulation::{
    AircraftKind, NodeId, Point, SegmentId, SimAirfield, SimConfig, Snapshot, SnapshotObserver,
    TickDriver, TickReport,
};

#[derive(Parser)]
#[command(name = "airfield_sim")]
#[command(about = "Airfield surface traffic simulation")]
struct Cli {
    /// Number of ticks to simulate
    #[arg(long, default_value = "300")]
    ticks: u64,

    /// Target number of live aircraft
    #[arg(long, default_value = "2")]
    population: usize,

    /// Wall-clock milliseconds between ticks
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Draw the radar view at every report
    #[arg(long)]
    map: bool,

    /// Log progress every N ticks (0 disables)
    #[arg(long, default_value = "10")]
    report_every: u64,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,airfield_sim=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SimConfig {
        target_population: cli.population,
        tick_period: Duration::from_millis(cli.tick_ms),
        seed: cli.seed,
    };

    let mut airfield = SimAirfield::with_default_aerodrome(config.seed)?;
    let slots = airfield.config().slot_count();
    if config.target_population > slots {
        anyhow::bail!(
            "Population {} exceeds the {} stands on this aerodrome",
            config.target_population,
            slots
        );
    }
    airfield.set_target_population(config.target_population);

    let mut radar = RadarView::new(&airfield, cli.report_every, cli.map);
    let mut driver = TickDriver::new(config.tick_period);
    driver.run(&mut airfield, cli.ticks, &mut radar);
    Ok(())
}

/// Terminal presentation: progress lines and an ASCII chart of the aerodrome
struct RadarView {
    background: Vec<Point>,
    stands: Vec<Point>,
    report_every: u64,
    draw_map: bool,
}

impl RadarView {
    fn new(airfield: &SimAirfield, report_every: u64, draw_map: bool) -> Self {
        let config = airfield.config();
        let background = (0..config.graph.position_count())
            .filter_map(|index| config.graph.point(NodeId(index)))
            .collect();
        let stands = config
            .slots
            .iter()
            .filter_map(|slot| config.graph.point(slot.position))
            .collect();

        Self {
            background,
            stands,
            report_every,
            draw_map,
        }
    }

    fn draw(&self, snapshot: &Snapshot) {
        const COLUMN_PX: f32 = 15.0;
        const ROW_PX: f32 = 25.0;

        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
        for point in &self.background {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        if !min_x.is_finite() {
            return;
        }

        let width = ((max_x - min_x) / COLUMN_PX) as usize + 1;
        let height = ((max_y - min_y) / ROW_PX) as usize + 1;
        let mut grid = vec![vec![' '; width]; height];

        let to_grid = |point: &Point| -> (usize, usize) {
            let col = ((point.x - min_x) / COLUMN_PX) as usize;
            let row = ((point.y - min_y) / ROW_PX) as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        for point in &self.background {
            let (row, col) = to_grid(point);
            grid[row][col] = '.';
        }
        for point in &self.stands {
            let (row, col) = to_grid(point);
            grid[row][col] = 'o';
        }
        if let Some(marker) = &snapshot.marker {
            let (row, col) = to_grid(marker);
            grid[row][col] = 'S';
        }
        for aircraft in &snapshot.aircraft {
            if let Some(point) = &aircraft.point {
                let (row, col) = to_grid(point);
                grid[row][col] = match aircraft.kind {
                    AircraftKind::Outbound => 'D',
                    AircraftKind::Inbound => 'A',
                };
            }
        }

        println!("\n=== Radar (tick {}) ===", snapshot.tick);
        println!("Legend: D=Departure, A=Arrival, S=Service vehicle, o=Stand, .=Taxiway");
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line.trim_end());
        }
        println!();
    }
}

impl SnapshotObserver for RadarView {
    fn on_tick(&mut self, report: &TickReport, snapshot: &Snapshot) {
        if self.report_every == 0 || report.tick % self.report_every != 0 {
            return;
        }

        let airborne = snapshot.aircraft.iter().filter(|a| a.point.is_none()).count();
        info!(
            "Tick {}: {} live ({} airborne), moved {}, held {}, retired {}, spawned {}",
            report.tick,
            report.population,
            airborne,
            report.moved,
            report.held,
            report.retired,
            report.spawned
        );

        if self.draw_map {
            self.draw(snapshot);
        }
    }

    fn on_finish(&mut self, airfield: &SimAirfield) {
        let segments = airfield.segments();
        for index in 0..segments.segment_count() {
            let segment = SegmentId(index);
            let queue: Vec<String> = segments.queue(segment).map(|id| id.to_string()).collect();
            if !queue.is_empty() {
                info!("{} queue: [{}]", segment, queue.join(", "));
            }
        }
    }
}
