use std::time::{Duration, Instant};

use ansv::{Direction, Policy, ansv, ansv_sequential, check_nsv};
use anyhow::{Context, Result, bail, ensure};
use bench::InputGenerator;
use clap::{ArgGroup, Parser, ValueEnum};
use comm::{Communicator, block_local_size};
use log::{debug, info};
use samplesort::{sample_sort, verify_sorted};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    Sort,
    Ansv,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    NearestSm,
    NearestEq,
    FurthestEq,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::NearestSm => Policy::NearestSmaller,
            PolicyArg::NearestEq => Policy::NearestEqual,
            PolicyArg::FurthestEq => Policy::FurthestEqual,
        }
    }
}

/// Times one distributed run on random input and prints `P;N;ms`.
#[derive(Parser, Debug)]
#[command(name = "dsa-driver")]
#[command(group(ArgGroup::new("size").required(true).args(["global", "per_rank"])))]
struct Args {
    /// Global input size.
    #[arg(short = 'n', value_name = "N")]
    global: Option<usize>,
    /// Input size per rank.
    #[arg(short = 'm', value_name = "N")]
    per_rank: Option<usize>,
    /// Number of ranks; defaults to the available parallelism, or to the
    /// MPI world size when built with the `mpi` feature.
    #[arg(short = 'p', long = "procs")]
    procs: Option<usize>,
    #[arg(long, value_enum, default_value_t = Algorithm::Sort)]
    algorithm: Algorithm,
    #[arg(long, value_enum, default_value_t = PolicyArg::NearestSm)]
    left_policy: PolicyArg,
    #[arg(long, value_enum, default_value_t = PolicyArg::NearestSm)]
    right_policy: PolicyArg,
    /// Rank `r` draws its input from seed `seed + r`.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Input values are drawn from `0..modulus`.
    #[arg(long, default_value_t = bench::DEFAULT_MODULUS)]
    modulus: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    ensure!(args.modulus > 0, "the modulus must be positive");
    launch(&args)
}

/// Global input size on `p` ranks.
fn input_size(args: &Args, p: usize) -> Result<usize> {
    ensure!(p > 0, "the number of ranks must be positive");
    let n = match (args.global, args.per_rank) {
        (Some(n), None) => n,
        (None, Some(m)) => m.checked_mul(p).context("input size overflows")?,
        _ => bail!("exactly one of -n and -m is required"),
    };
    ensure!(n > 0, "the input size must be positive");
    info!("running {:?} on {p} ranks, n = {n}", args.algorithm);
    Ok(n)
}

#[cfg(not(feature = "mpi"))]
fn launch(args: &Args) -> Result<()> {
    let p = match args.procs {
        Some(p) => p,
        None => std::thread::available_parallelism().map_or(1, usize::from),
    };
    let n = input_size(args, p)?;
    let results = comm::LocalUniverse::new(p).run(|comm| run_rank(comm, args, n));
    results.into_iter().collect()
}

#[cfg(feature = "mpi")]
fn launch(args: &Args) -> Result<()> {
    let universe = mpi::initialize().context("MPI is already initialized")?;
    let comm = comm::MpiComm::new(universe.world());
    let p = comm.size();
    if let Some(procs) = args.procs {
        ensure!(procs == p, "-p {procs} does not match the {p} MPI processes");
    }
    let n = input_size(args, p)?;
    run_rank(&comm, args, n)
}

fn run_rank<C: Communicator>(comm: &C, args: &Args, n: usize) -> Result<()> {
    let duration = match args.algorithm {
        Algorithm::Sort => time_sort(comm, args, n)?,
        Algorithm::Ansv => time_ansv(comm, args, n)?,
    };
    debug!("rank {} done in {duration:?}", comm.rank());
    Ok(())
}

fn local_input<C: Communicator>(comm: &C, args: &Args, n: usize) -> Vec<u64> {
    let len = block_local_size(n, comm.size(), comm.rank());
    InputGenerator::for_rank(args.seed, comm.rank(), args.modulus).generate(len)
}

/// Runs `f` between two barriers and reports the time on the root.
fn timed<C: Communicator, R>(comm: &C, n: usize, f: impl FnOnce() -> R) -> (R, Duration) {
    comm.barrier();
    let start = Instant::now();
    let out = f();
    comm.barrier();
    let duration = start.elapsed();
    if comm.is_root() {
        println!("{};{};{}", comm.size(), n, duration.as_secs_f64() * 1e3);
    }
    (out, duration)
}

fn time_sort<C: Communicator>(comm: &C, args: &Args, n: usize) -> Result<Duration> {
    let mut local = local_input(comm, args, n);
    let ((), duration) = timed(comm, n, || sample_sort(&mut local, comm));
    verify_sorted(&local, u64::cmp, comm).context("ERROR: Output is not sorted!")?;
    Ok(duration)
}

fn time_ansv<C: Communicator>(comm: &C, args: &Args, n: usize) -> Result<Duration> {
    let (left, right) = (args.left_policy.into(), args.right_policy.into());
    let local = local_input(comm, args, n);
    let (nsv, duration) = timed(comm, n, || ansv(&local, left, right, comm));

    let values = comm.gather(0, local);
    let lefts = comm.gather(0, encode(&nsv.left));
    let rights = comm.gather(0, encode(&nsv.right));
    if let (Some((values, _)), Some((lefts, _)), Some((rights, _))) = (values, lefts, rights) {
        let (lefts, rights) = (decode(lefts), decode(rights));
        check_nsv(&values, &lefts, Direction::Left, left)
            .context("ERROR: left answers are wrong")?;
        check_nsv(&values, &rights, Direction::Right, right)
            .context("ERROR: right answers are wrong")?;
        let expected = ansv_sequential(&values, left, right);
        ensure!(
            expected.left == lefts && expected.right == rights,
            "ERROR: distributed answers differ from the sequential scan"
        );
    }
    Ok(duration)
}

// answers travel as plain indices, `usize::MAX` for none
const NO_ANSWER: usize = usize::MAX;

fn encode(answers: &[Option<usize>]) -> Vec<usize> {
    answers.iter().map(|a| a.unwrap_or(NO_ANSWER)).collect()
}

fn decode(answers: Vec<usize>) -> Vec<Option<usize>> {
    answers
        .into_iter()
        .map(|a| (a != NO_ANSWER).then_some(a))
        .collect()
}
