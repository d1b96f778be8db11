use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use codec::{ClientReceiver, CodecLimits, Tick};
use pool::{ClientId, DeltaServer, InboundQueue, InboundSender, PoolConfig, PoolEvent, Transport};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use world::{
    Angle, ElementCounts, ElementId, Fixed, MapId, MapState, Point, TextureId, WorldView,
};

#[derive(Parser)]
#[command(
    name = "demo-sim",
    version,
    about = "Deterministic lossy-network simulation of the dsync delta pool"
)]
struct Cli {
    /// Sectors in the generated map.
    #[arg(long, default_value_t = 96)]
    sectors: u32,
    /// Sides in the generated map.
    #[arg(long, default_value_t = 192)]
    sides: u32,
    /// Polyobjects in the generated map.
    #[arg(long, default_value_t = 4)]
    polys: u32,
    /// Connected clients.
    #[arg(long, default_value_t = 3)]
    clients: u32,
    /// Ticks of world activity to simulate.
    #[arg(long, default_value_t = 700)]
    ticks: u32,
    /// Extra quiet ticks allowed for every pool to settle.
    #[arg(long, default_value_t = 2000)]
    settle_ticks: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Probability a datagram is lost.
    #[arg(long, default_value_t = 0.1)]
    loss: f64,
    /// Probability a datagram is delivered twice.
    #[arg(long, default_value_t = 0.02)]
    duplicate: f64,
    /// Probability a datagram is delayed behind later ones.
    #[arg(long, default_value_t = 0.05)]
    reorder: f64,
    /// One-way latency in ticks.
    #[arg(long, default_value_t = 2)]
    latency: u32,
    /// Optional JSON pool configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for captures and the summary.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Fail if the average delta-set packet exceeds this many bytes.
    #[arg(long)]
    max_avg_set_bytes: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PoolConfig::default(),
    };
    if let Some(out_dir) = &cli.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
    }

    let mut rng = Rng::new(cli.seed);
    let counts = ElementCounts::new(cli.sectors, cli.sides, cli.polys);
    let map_id = MapId::derive("DEMO01", counts, 1);
    let mut world = build_world(counts, &mut rng);

    let mut server = DeltaServer::new(map_id, config.clone()).context("pool config")?;
    let inbound = InboundQueue::new();
    let mut net = Network::new(&cli, Rng::new(cli.seed ^ 0x5EED));
    let mut clients: Vec<SimClient> = (0..cli.clients)
        .map(|i| {
            let id = ClientId(i + 1);
            let stamp = server.on_client_joined(id, &world);
            SimClient {
                id,
                receiver: ClientReceiver::new(stamp, config.limits.clone()),
                mirror: MapState::new(counts),
                ack_sender: inbound.sender(),
            }
        })
        .collect();
    info!(clients = cli.clients, elements = counts.total(), map = %map_id, "simulation started");

    let mut summary = Summary::new(&cli);
    let mut movers = Movers::new(counts);
    let end = cli.ticks + cli.settle_ticks;
    let mut now = 0;
    while now < end {
        let active = now < cli.ticks;
        net.lossless = !active;
        if active {
            for id in movers.step(&mut world, &mut rng, now) {
                server.notify_element_changed(id);
            }
            for client in &clients {
                let viewpoint = client_viewpoint(client.id, now, counts);
                server.set_viewpoint(client.id, Some(viewpoint));
            }
        }

        server.drain_inbound(&inbound);
        net.now = now;
        let report = server.tick(Tick::new(now), &world, &mut net);
        for event in &report.events {
            match event {
                PoolEvent::PoolSaturated { client, outstanding } => {
                    summary.saturations += 1;
                    info!(client = client.0, outstanding, "pool saturated");
                }
                PoolEvent::ClientUnresponsive { client, sequence } => {
                    anyhow::bail!("client {} unresponsive at set {}", client.0, sequence.raw());
                }
            }
        }

        for datagram in net.due(now) {
            summary.push_datagram(datagram.bytes.len() as u64);
            if let Some(out_dir) = &cli.out_dir {
                write_capture(out_dir, now, datagram.client, &datagram.bytes, &config.limits)?;
            }
            let Some(client) = clients.iter_mut().find(|c| c.id == datagram.client) else {
                continue;
            };
            client.receive(&datagram.bytes, &mut net, now)?;
        }
        net.flush_acks(now, &clients);

        now += 1;
        if !active && settled(&server, &clients) {
            break;
        }
    }

    if !settled(&server, &clients) {
        anyhow::bail!("pools did not settle within {} ticks", cli.settle_ticks);
    }
    for client in &clients {
        let diverged = counts
            .ids()
            .any(|id| client.mirror.element(id) != world.element(id));
        if diverged {
            anyhow::bail!("client {} mirror diverged from the world", client.id.0);
        }
    }

    summary.finalize(now, &server, &net);
    info!(settled_at = now, "all clients converged");
    summary.assert_budget(cli.max_avg_set_bytes)?;
    let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    match &cli.out_dir {
        Some(out_dir) => {
            let path = out_dir.join("summary.json");
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<PoolConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_str(&contents).context("parse pool config json")
}

fn write_capture(
    out_dir: &Path,
    tick: u32,
    client: ClientId,
    bytes: &[u8],
    limits: &CodecLimits,
) -> Result<()> {
    let report = tools::inspect_packet(bytes, limits).context("inspect outgoing packet")?;
    let path = out_dir.join(format!(
        "set_{tick:06}_c{}_s{:06}.bin",
        client.0, report.header.sequence
    ));
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
}

fn settled(server: &DeltaServer, clients: &[SimClient]) -> bool {
    clients.iter().all(|client| {
        server.pool(client.id).is_some_and(|pool| {
            pool.is_live() && pool.dirty_len() == 0 && pool.tracker().outstanding() == 0
        })
    })
}

/// Each client walks a slow circle around the middle of the map.
fn client_viewpoint(client: ClientId, now: u32, counts: ElementCounts) -> Point {
    let side = grid_side(counts.sectors) as i32 * CELL;
    let phase = (now / 4 + client.0 * 90) % 360;
    let (x, y) = match phase / 90 {
        0 => (phase % 90, 0),
        1 => (90, phase % 90),
        2 => (90 - phase % 90, 90),
        _ => (0, 90 - phase % 90),
    };
    Point::from_units(x as i32 * side / 90, y as i32 * side / 90)
}

const CELL: i32 = 256;

fn grid_side(sectors: u32) -> u32 {
    let mut side = 1;
    while side * side < sectors {
        side += 1;
    }
    side
}

fn build_world(counts: ElementCounts, rng: &mut Rng) -> MapState {
    let mut map = MapState::new(counts);
    let grid = grid_side(counts.sectors);
    for index in 0..counts.sectors {
        let Some(sector) = map.sector_mut(index) else {
            continue;
        };
        sector.floor_height = Fixed::from_int(rng.range_i32(-64, 64));
        sector.ceiling_height = Fixed::from_int(sector.floor_height.to_int() + 128);
        sector.light_level = 96 + (rng.next_u32() % 160) as u8;
        sector.floor_texture = TextureId((rng.next_u32() % 40) as u16);
        sector.ceiling_texture = TextureId((rng.next_u32() % 40) as u16);
        sector.color = [255, 255, 255];
        let (col, row) = (index % grid, index / grid);
        map.set_origin(
            ElementId::sector(index),
            Point::from_units(col as i32 * CELL + CELL / 2, row as i32 * CELL + CELL / 2),
        );
    }
    for index in 0..counts.sides {
        let Some(side) = map.side_mut(index) else {
            continue;
        };
        side.middle_texture = TextureId((rng.next_u32() % 80) as u16);
        side.middle_alpha = 255;
    }
    for index in 0..counts.polys {
        let Some(poly) = map.poly_mut(index) else {
            continue;
        };
        poly.origin_x = Fixed::from_int(rng.range_i32(0, 2048));
        poly.origin_y = Fixed::from_int(rng.range_i32(0, 2048));
    }
    map
}

/// World activity: moving floors, flickering lights, scrolling walls and
/// spinning polyobjects.
struct Movers {
    counts: ElementCounts,
    /// Sector index and the floor height it is heading for.
    lifts: Vec<(u32, i32)>,
}

impl Movers {
    fn new(counts: ElementCounts) -> Self {
        Self {
            counts,
            lifts: Vec::new(),
        }
    }

    fn step(&mut self, world: &mut MapState, rng: &mut Rng, now: u32) -> Vec<ElementId> {
        let mut changed = Vec::new();
        if self.counts.sectors > 0 {
            if rng.next_u32() % 8 == 0 {
                let index = rng.next_u32() % self.counts.sectors;
                self.lifts.push((index, rng.range_i32(-128, 128)));
            }
            self.lifts.retain(|&(index, target)| {
                let Some(sector) = world.sector_mut(index) else {
                    return false;
                };
                let floor = sector.floor_height.to_int();
                let step = (target - floor).clamp(-2, 2);
                sector.floor_height = Fixed::from_int(floor + step);
                sector.floor_target = Fixed::from_int(target);
                sector.floor_speed = Fixed::from_int(step.abs());
                changed.push(ElementId::sector(index));
                step != 0
            });
            if now % 5 == 0 {
                let index = rng.next_u32() % self.counts.sectors;
                if let Some(sector) = world.sector_mut(index) {
                    sector.light_level = 96 + (rng.next_u32() % 160) as u8;
                    changed.push(ElementId::sector(index));
                }
            }
        }
        if self.counts.sides > 0 && now % 2 == 0 {
            let index = now / 2 % self.counts.sides;
            if let Some(side) = world.side_mut(index) {
                side.offset_x = Fixed::from_raw(side.offset_x.raw().wrapping_add(1 << 15));
                changed.push(ElementId::side(index));
            }
        }
        for index in 0..self.counts.polys {
            if let Some(poly) = world.poly_mut(index) {
                poly.angle = Angle(poly.angle.raw().wrapping_add(Angle::ANG90.raw() / 35));
                poly.angle_speed = Angle(Angle::ANG90.raw() / 35);
                changed.push(ElementId::poly(index));
            }
        }
        changed
    }
}

struct SimClient {
    id: ClientId,
    receiver: ClientReceiver,
    mirror: MapState,
    ack_sender: InboundSender,
}

impl SimClient {
    fn receive(&mut self, bytes: &[u8], net: &mut Network, now: u32) -> Result<()> {
        let outcome = self
            .receiver
            .receive(&mut self.mirror, bytes)
            .with_context(|| format!("client {} decode", self.id.0))?;
        if !outcome.report.is_clean() {
            warn!(client = self.id.0, rejected = outcome.report.rejected.len(), "deltas rejected");
        }
        if let Some(ack) = outcome.ack {
            net.send_ack(self.id, ack, now);
        }
        Ok(())
    }
}

struct Datagram {
    deliver_at: u32,
    client: ClientId,
    bytes: Vec<u8>,
}

/// Both directions of an unreliable link with latency, loss, duplication
/// and reordering.
struct Network {
    rng: Rng,
    latency: u32,
    loss: f64,
    duplicate: f64,
    reorder: f64,
    /// Set once world activity stops so every pool can settle.
    lossless: bool,
    to_clients: Vec<Datagram>,
    to_server: Vec<Datagram>,
    lost: u64,
    duplicated: u64,
    reordered: u64,
    /// Tick the server is sending on.
    now: u32,
}

impl Network {
    fn new(cli: &Cli, rng: Rng) -> Self {
        Self {
            rng,
            latency: cli.latency,
            loss: cli.loss,
            duplicate: cli.duplicate,
            reorder: cli.reorder,
            lossless: false,
            to_clients: Vec::new(),
            to_server: Vec::new(),
            lost: 0,
            duplicated: 0,
            reordered: 0,
            now: 0,
        }
    }

    fn schedule(&mut self, client: ClientId, bytes: Vec<u8>, now: u32, to_server: bool) {
        let mut copies = 1;
        if !self.lossless {
            if self.rng.chance(self.loss) {
                self.lost += 1;
                return;
            }
            if self.rng.chance(self.duplicate) {
                self.duplicated += 1;
                copies = 2;
            }
        }
        for _ in 0..copies {
            let mut delay = self.latency;
            if !self.lossless && self.rng.chance(self.reorder) {
                self.reordered += 1;
                delay += 1 + self.rng.next_u32() % 6;
            }
            let datagram = Datagram {
                deliver_at: now + delay,
                client,
                bytes: bytes.clone(),
            };
            if to_server {
                self.to_server.push(datagram);
            } else {
                self.to_clients.push(datagram);
            }
        }
    }

    fn send_ack(&mut self, client: ClientId, bytes: Vec<u8>, now: u32) {
        self.schedule(client, bytes, now, true);
    }

    /// Server-bound datagrams due by `now`, handed to the inbound queue.
    fn flush_acks(&mut self, now: u32, clients: &[SimClient]) {
        let (due, later): (Vec<_>, Vec<_>) =
            self.to_server.drain(..).partition(|d| d.deliver_at <= now);
        self.to_server = later;
        for datagram in due {
            if let Some(client) = clients.iter().find(|c| c.id == datagram.client) {
                client.ack_sender.send(datagram.client, datagram.bytes);
            }
        }
    }

    /// Client-bound datagrams due by `now`, in arrival order.
    fn due(&mut self, now: u32) -> Vec<Datagram> {
        let (mut due, later): (Vec<_>, Vec<_>) =
            self.to_clients.drain(..).partition(|d| d.deliver_at <= now);
        self.to_clients = later;
        due.sort_by_key(|d| d.deliver_at);
        due
    }
}

impl Transport for Network {
    fn send(&mut self, client: ClientId, bytes: &[u8]) {
        let now = self.now;
        self.schedule(client, bytes.to_vec(), now, false);
    }
}

/// Deterministic LCG.
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let span = min.abs_diff(max).max(1) + 1;
        min + (self.next_u32() % span) as i32
    }

    fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && f64::from(self.next_u32()) / f64::from(u32::MAX) < probability
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    sectors: u32,
    sides: u32,
    polys: u32,
    clients: u32,
    ticks: u32,
    seed: u64,
    loss: f64,
    settled_at: u32,
    datagrams_delivered: u64,
    datagrams_lost: u64,
    datagrams_duplicated: u64,
    datagrams_reordered: u64,
    avg_set_bytes: u64,
    p95_set_bytes: u64,
    saturations: u64,
    pools: pool::PoolStats,
    #[serde(skip)]
    set_sizes: Vec<u64>,
}

impl Summary {
    fn new(cli: &Cli) -> Self {
        Self {
            sectors: cli.sectors,
            sides: cli.sides,
            polys: cli.polys,
            clients: cli.clients,
            ticks: cli.ticks,
            seed: cli.seed,
            loss: cli.loss,
            settled_at: 0,
            datagrams_delivered: 0,
            datagrams_lost: 0,
            datagrams_duplicated: 0,
            datagrams_reordered: 0,
            avg_set_bytes: 0,
            p95_set_bytes: 0,
            saturations: 0,
            pools: pool::PoolStats::default(),
            set_sizes: Vec::new(),
        }
    }

    fn push_datagram(&mut self, bytes: u64) {
        self.datagrams_delivered += 1;
        self.set_sizes.push(bytes);
    }

    fn finalize(&mut self, now: u32, server: &DeltaServer, net: &Network) {
        self.settled_at = now;
        self.pools = server.stats();
        self.datagrams_lost = net.lost;
        self.datagrams_duplicated = net.duplicated;
        self.datagrams_reordered = net.reordered;
        if !self.set_sizes.is_empty() {
            let total: u64 = self.set_sizes.iter().sum();
            self.avg_set_bytes = total / self.set_sizes.len() as u64;
            self.set_sizes.sort_unstable();
            let idx = ((self.set_sizes.len() as f64) * 0.95).ceil() as usize;
            let idx = idx.saturating_sub(1).min(self.set_sizes.len() - 1);
            self.p95_set_bytes = self.set_sizes[idx];
        }
    }

    fn assert_budget(&self, max_avg: Option<u64>) -> Result<()> {
        if let Some(max_avg) = max_avg {
            if self.avg_set_bytes > max_avg {
                anyhow::bail!(
                    "avg delta-set bytes {} exceeds budget {}",
                    self.avg_set_bytes,
                    max_avg
                );
            }
        }
        Ok(())
    }
}
