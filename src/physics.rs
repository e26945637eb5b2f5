/*
 * Physics Module
 *
 * This module advances a flock by one Vicsek timestep:
 * 1. Free motion along the incoming heading
 * 2. Periodic wrap into [0, L)
 * 3. Neighbor discovery: every bird (self included) with squared distance
 *    below R^2, using raw post-wrap coordinates (no wrap-around distance)
 * 4. Circular mean of neighbor headings via atan2 of summed sines/cosines
 * 5. Uniform noise eta * (u - 0.5), one draw per bird in index order
 * 6. Velocity rebuilt from the new heading
 *
 * Steps 3-4 can run sequentially or fanned out over a rayon pool. Both paths
 * call the same per-bird routine with the same summation order, so they
 * agree bit for bit. Noise draws are materialized before the fan-out so the
 * random stream is never touched from worker threads.
 */

use glam::DVec2;
use rayon::prelude::*;

use crate::bird::Bird;
use crate::error::{Error, Result};
use crate::params::{AlignmentOrder, ExecutionStrategy, KernelSettings, SimulationParameters};
use crate::rng::RandomStream;
use crate::spatial_grid::SpatialGrid;
use crate::state::FlockState;

/// Result of one kernel invocation.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub state: FlockState,
    pub positions: Vec<DVec2>,
    pub velocities: Vec<DVec2>,
}

/// Circular mean of a set of headings: `atan2(sum sin, sum cos)`.
/// An empty or perfectly cancelling set yields 0.
pub fn circular_mean<I>(headings: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sx, sy) = headings
        .into_iter()
        .fold((0.0, 0.0), |(sx, sy), h| (sx + h.cos(), sy + h.sin()));
    mean_from_sums(sx, sy)
}

#[inline]
fn mean_from_sums(sx: f64, sy: f64) -> f64 {
    if sx == 0.0 && sy == 0.0 {
        0.0
    } else {
        sy.atan2(sx)
    }
}

// Where neighbor candidates come from
enum Candidates {
    All(usize),
    Grid(SpatialGrid),
}

impl Candidates {
    fn build(positions: &[DVec2], params: &SimulationParameters, settings: &KernelSettings) -> Self {
        if settings.enable_spatial_grid {
            let cell_size = params.radius * settings.cell_size_factor;
            Candidates::Grid(SpatialGrid::build(
                positions,
                cell_size,
                params.radius,
                params.domain_size,
            ))
        } else {
            Candidates::All(positions.len())
        }
    }
}

// Circular mean heading of bird `b` over its neighbor set
#[inline]
fn mean_heading(
    b: usize,
    positions: &[DVec2],
    headings: &[f64],
    radius_sq: f64,
    candidates: &Candidates,
) -> f64 {
    let origin = positions[b];
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut visit = |j: usize| {
        if positions[j].distance_squared(origin) < radius_sq {
            sx += headings[j].cos();
            sy += headings[j].sin();
        }
    };

    match candidates {
        Candidates::All(n) => (0..*n).for_each(&mut visit),
        Candidates::Grid(grid) => grid.nearby_indices(origin).into_iter().for_each(&mut visit),
    }

    mean_from_sums(sx, sy)
}

// Steps 1-2
fn advance_positions(birds: &mut [Bird], params: &SimulationParameters) {
    for bird in birds.iter_mut() {
        bird.advance(params.v0, params.dt);
        bird.wrap_edges(params.domain_size);
    }
}

// Steps 3-4 against a frozen snapshot of the pre-step headings
fn align_snapshot(
    positions: &[DVec2],
    headings: &[f64],
    radius_sq: f64,
    candidates: &Candidates,
    execution: ExecutionStrategy,
) -> Vec<f64> {
    let n = positions.len();
    match execution {
        ExecutionStrategy::Parallel => (0..n)
            .into_par_iter()
            .map(|b| mean_heading(b, positions, headings, radius_sq, candidates))
            .collect(),
        ExecutionStrategy::Sequential => (0..n)
            .map(|b| mean_heading(b, positions, headings, radius_sq, candidates))
            .collect(),
    }
}

// Steps 3-4 in index order, each bird reading the already-updated
// headings of lower-indexed birds
fn align_in_place(
    positions: &[DVec2],
    mut headings: Vec<f64>,
    radius_sq: f64,
    candidates: &Candidates,
) -> Vec<f64> {
    for b in 0..positions.len() {
        let mean = mean_heading(b, positions, &headings, radius_sq, candidates);
        headings[b] = mean;
    }
    headings
}

fn check_finite(frame: usize, birds: &[Bird]) -> Result<()> {
    for (index, bird) in birds.iter().enumerate() {
        if !bird.position.is_finite() {
            return Err(Error::NumericAnomaly {
                frame,
                index,
                quantity: "position",
            });
        }
        if !bird.heading.is_finite() {
            return Err(Error::NumericAnomaly {
                frame,
                index,
                quantity: "heading",
            });
        }
    }
    Ok(())
}

/// Advances `state` by one timestep.
///
/// Consumes `params.num_birds` draws from `rng`. Fails before touching the
/// state if the parameters or settings are out of domain, and fails after
/// the step if any position or heading became non-finite.
pub fn step(
    frame: usize,
    params: &SimulationParameters,
    settings: &KernelSettings,
    state: FlockState,
    rng: &mut RandomStream,
) -> Result<StepOutput> {
    params.validate()?;
    settings.validate()?;
    if state.len() != params.num_birds {
        return Err(Error::StateMismatch {
            expected: params.num_birds,
            found: state.len(),
        });
    }

    let mut birds = state.birds;
    advance_positions(&mut birds, params);

    let positions: Vec<DVec2> = birds.iter().map(|b| b.position).collect();
    let headings: Vec<f64> = birds.iter().map(|b| b.heading).collect();
    let radius_sq = params.radius_squared();
    let candidates = Candidates::build(&positions, params, settings);

    let mean = match settings.alignment {
        AlignmentOrder::Snapshot => {
            align_snapshot(&positions, &headings, radius_sq, &candidates, settings.execution)
        }
        AlignmentOrder::InPlace => align_in_place(&positions, headings, radius_sq, &candidates),
    };

    // Step 5: noise, drawn up front in index order
    let noise = rng.draw(birds.len());
    for ((bird, m), u) in birds.iter_mut().zip(mean).zip(noise) {
        bird.heading = m + params.eta * (u - 0.5);
    }

    check_finite(frame, &birds)?;

    // Step 6
    let velocities: Vec<DVec2> = birds.iter().map(|b| b.velocity(params.v0)).collect();
    log::trace!("frame {}: stepped {} birds", frame, birds.len());

    Ok(StepOutput {
        state: FlockState { birds },
        positions,
        velocities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn params_for(n: usize) -> SimulationParameters {
        SimulationParameters {
            num_birds: n,
            ..Default::default()
        }
    }

    fn flock(points: &[(f64, f64, f64)], params: &SimulationParameters) -> FlockState {
        let positions: Vec<DVec2> = points.iter().map(|&(x, y, _)| DVec2::new(x, y)).collect();
        let headings: Vec<f64> = points.iter().map(|&(_, _, h)| h).collect();
        FlockState::from_parts(&positions, &headings, params).unwrap()
    }

    #[test]
    fn circular_mean_handles_wrap_around() {
        // 350 and 10 degrees average to 0, not 180
        let m = circular_mean([350f64.to_radians(), 10f64.to_radians()]);
        assert_relative_eq!(m, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn circular_mean_of_nothing_is_zero() {
        assert_eq!(circular_mean(std::iter::empty()), 0.0);
        assert_eq!(mean_from_sums(0.0, 0.0), 0.0);
        assert_eq!(mean_from_sums(-0.0, -0.0), 0.0);
    }

    #[test]
    fn circular_mean_of_cancelling_pair_is_zero() {
        assert_eq!(circular_mean([FRAC_PI_2, -FRAC_PI_2]), 0.0);
    }

    #[test]
    fn isolated_bird_keeps_its_heading_without_noise() {
        let params = SimulationParameters {
            eta: 0.0,
            num_birds: 2,
            ..Default::default()
        };
        let state = flock(&[(2.0, 2.0, 2.5), (7.0, 7.0, -1.0)], &params);
        let mut rng = RandomStream::seeded(1);
        let out = step(0, &params, &KernelSettings::sequential(), state, &mut rng).unwrap();
        assert_relative_eq!(out.state.birds[0].heading, 2.5, epsilon = 1e-12);
        assert_relative_eq!(out.state.birds[1].heading, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn close_pair_aligns_to_mean_heading() {
        let params = SimulationParameters {
            eta: 0.0,
            v0: 0.0,
            num_birds: 2,
            ..Default::default()
        };
        let state = flock(&[(5.0, 5.0, 0.2), (5.3, 5.0, 0.6)], &params);
        let mut rng = RandomStream::seeded(1);
        let out = step(0, &params, &KernelSettings::sequential(), state, &mut rng).unwrap();
        for b in &out.state.birds {
            assert_relative_eq!(b.heading, 0.4, epsilon = 1e-12);
        }
    }

    #[test]
    fn neighbor_distance_does_not_wrap() {
        // Birds at opposite edges are 0.2 apart on the torus but not neighbors here
        let params = SimulationParameters {
            eta: 0.0,
            v0: 0.0,
            num_birds: 2,
            ..Default::default()
        };
        let state = flock(&[(0.1, 5.0, 1.0), (9.9, 5.0, -1.0)], &params);
        let mut rng = RandomStream::seeded(1);
        let out = step(0, &params, &KernelSettings::sequential(), state, &mut rng).unwrap();
        assert_relative_eq!(out.state.birds[0].heading, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.state.birds[1].heading, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn in_place_order_feeds_updated_headings_forward() {
        // 0 and 1 are neighbors, 1 and 2 are neighbors, 0 and 2 are not
        let params = SimulationParameters {
            eta: 0.0,
            v0: 0.0,
            num_birds: 3,
            ..Default::default()
        };
        let points = [(5.0, 5.0, 0.0), (5.8, 5.0, 1.0), (6.6, 5.0, 1.0)];
        let snapshot = step(
            0,
            &params,
            &KernelSettings::sequential(),
            flock(&points, &params),
            &mut RandomStream::seeded(1),
        )
        .unwrap();
        let in_place = step(
            0,
            &params,
            &KernelSettings::reference(),
            flock(&points, &params),
            &mut RandomStream::seeded(1),
        )
        .unwrap();

        // Bird 1 reads 0's new heading (0.5) only in place
        assert_relative_eq!(
            snapshot.state.birds[1].heading,
            circular_mean([0.0, 1.0, 1.0]),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            in_place.state.birds[1].heading,
            circular_mean([0.5, 1.0, 1.0]),
            epsilon = 1e-12
        );
        // Bird 0 has no earlier neighbors, so both orders agree
        assert_relative_eq!(
            snapshot.state.birds[0].heading,
            in_place.state.birds[0].heading
        );
    }

    #[test]
    fn noise_is_bounded_by_eta() {
        let params = SimulationParameters {
            eta: 0.8,
            num_birds: 1,
            ..Default::default()
        };
        let mut rng = RandomStream::seeded(3);
        let mut state = flock(&[(5.0, 5.0, 0.0)], &params);
        for frame in 0..50 {
            let before = state.birds[0].heading;
            let expected_mean = before.sin().atan2(before.cos());
            let out = step(frame, &params, &KernelSettings::sequential(), state, &mut rng).unwrap();
            let delta = out.state.birds[0].heading - expected_mean;
            assert!(delta.abs() <= 0.4 + 1e-12, "delta {delta}");
            state = out.state;
        }
        assert_eq!(rng.draws_taken(), 50);
    }

    #[test]
    fn step_consumes_one_draw_per_bird() {
        let params = params_for(10);
        let mut rng = RandomStream::seeded(17);
        let state = FlockState::initialize(&params, &mut rng).unwrap();
        step(0, &params, &KernelSettings::default(), state, &mut rng).unwrap();
        assert_eq!(rng.draws_taken(), 40);
    }

    #[test]
    fn parallel_grid_and_sequential_agree_exactly() {
        let params = SimulationParameters {
            num_birds: 300,
            domain_size: 12.0,
            radius: 1.3,
            ..Default::default()
        };
        let mut rng = RandomStream::seeded(99);
        let initial = FlockState::initialize(&params, &mut rng).unwrap();

        let strategies = [
            KernelSettings::sequential(),
            KernelSettings::default(),
            KernelSettings {
                enable_spatial_grid: true,
                ..KernelSettings::sequential()
            },
            KernelSettings {
                enable_spatial_grid: true,
                cell_size_factor: 0.4,
                ..KernelSettings::default()
            },
        ];

        let runs: Vec<FlockState> = strategies
            .iter()
            .map(|settings| {
                let mut rng = RandomStream::seeded(5);
                let mut state = initial.clone();
                for frame in 0..5 {
                    state = step(frame, &params, settings, state, &mut rng).unwrap().state;
                }
                state
            })
            .collect();

        for other in &runs[1..] {
            assert_eq!(&runs[0], other);
        }
    }

    #[test]
    fn grid_with_huge_radius_matches_brute_force() {
        let params = SimulationParameters {
            radius: 1e20,
            ..params_for(10)
        };
        let mut rng = RandomStream::seeded(21);
        let initial = FlockState::initialize(&params, &mut rng).unwrap();
        let grid = KernelSettings {
            enable_spatial_grid: true,
            cell_size_factor: 1e-20,
            ..KernelSettings::sequential()
        };

        let headings = initial.headings();
        let a = step(0, &params, &grid, initial.clone(), &mut RandomStream::seeded(4)).unwrap();
        let b = step(0, &params, &KernelSettings::sequential(), initial, &mut RandomStream::seeded(4))
            .unwrap();
        assert_eq!(a.state, b.state);

        // Every bird sees the whole flock
        let noise = RandomStream::seeded(4).next_unit();
        let mean = a.state.birds[0].heading - params.eta * (noise - 0.5);
        assert_relative_eq!(mean, circular_mean(headings), epsilon = 1e-12);
    }

    #[test]
    fn in_place_ignores_parallel_request() {
        let params = params_for(40);
        let mut rng = RandomStream::seeded(8);
        let initial = FlockState::initialize(&params, &mut rng).unwrap();
        let parallel = KernelSettings {
            alignment: AlignmentOrder::InPlace,
            ..KernelSettings::default()
        };
        let a = step(0, &params, &parallel, initial.clone(), &mut RandomStream::seeded(2)).unwrap();
        let b = step(0, &params, &KernelSettings::reference(), initial, &mut RandomStream::seeded(2))
            .unwrap();
        assert_eq!(a.state, b.state);
    }

    #[test]
    fn outputs_are_index_aligned_and_wrapped() {
        let params = SimulationParameters {
            num_birds: 50,
            v0: 3.0,
            dt: 0.7,
            ..Default::default()
        };
        let mut rng = RandomStream::seeded(21);
        let state = FlockState::initialize(&params, &mut rng).unwrap();
        let out = step(0, &params, &KernelSettings::default(), state, &mut rng).unwrap();
        assert_eq!(out.positions.len(), 50);
        assert_eq!(out.velocities.len(), 50);
        for (i, bird) in out.state.birds.iter().enumerate() {
            assert_eq!(out.positions[i], bird.position);
            assert_eq!(out.velocities[i], bird.velocity(3.0));
            assert!((0.0..10.0).contains(&bird.position.x));
            assert!((0.0..10.0).contains(&bird.position.y));
            assert_relative_eq!(out.velocities[i].length(), 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_invalid_input_before_drawing() {
        let params = params_for(3);
        let mut rng = RandomStream::seeded(17);
        let state = FlockState::initialize(&params, &mut rng).unwrap();

        let bad = SimulationParameters {
            radius: -1.0,
            ..params
        };
        let err = step(0, &bad, &KernelSettings::default(), state.clone(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));

        let wrong_size = params_for(4);
        let err = step(0, &wrong_size, &KernelSettings::default(), state, &mut rng).unwrap_err();
        assert_eq!(
            err,
            Error::StateMismatch {
                expected: 4,
                found: 3
            }
        );
        assert_eq!(rng.draws_taken(), 9);
    }

    #[test]
    fn overflowing_motion_is_reported() {
        let params = SimulationParameters {
            v0: 1e308,
            dt: 10.0,
            num_birds: 1,
            ..Default::default()
        };
        let state = flock(&[(1.0, 1.0, 0.0)], &params);
        let err = step(4, &params, &KernelSettings::default(), state, &mut RandomStream::seeded(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::NumericAnomaly {
                frame: 4,
                index: 0,
                quantity: "position"
            }
        );
    }

    #[test]
    fn heading_far_outside_principal_range_is_fine() {
        let params = SimulationParameters {
            eta: 0.0,
            num_birds: 1,
            ..Default::default()
        };
        let state = flock(&[(5.0, 5.0, 40.0 * PI + 0.3)], &params);
        let out = step(0, &params, &KernelSettings::sequential(), state, &mut RandomStream::seeded(1))
            .unwrap();
        assert_relative_eq!(out.state.birds[0].heading, 0.3, epsilon = 1e-9);
    }
}
