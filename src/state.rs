/*
 * Flock State Module
 *
 * The per-particle state that flows through the step sequence. Entry i of
 * every array view (positions, headings, velocities) describes the same
 * bird, and the flock never changes size during a run.
 */

use glam::DVec2;
use std::f64::consts::TAU;

use crate::bird::Bird;
use crate::error::{Error, Result};
use crate::params::SimulationParameters;
use crate::rng::RandomStream;

#[derive(Debug, Clone, PartialEq)]
pub struct FlockState {
    pub birds: Vec<Bird>,
}

impl FlockState {
    /// Random initial flock.
    ///
    /// Draw order is fixed: all x coordinates, then all y coordinates, then
    /// all headings. Positions are uniform in [0, L), headings in [0, 2π).
    pub fn initialize(params: &SimulationParameters, rng: &mut RandomStream) -> Result<Self> {
        params.validate()?;
        let n = params.num_birds;
        let size = params.domain_size;

        let xs: Vec<f64> = rng.draw(n).into_iter().map(|u| u * size).collect();
        let ys: Vec<f64> = rng.draw(n).into_iter().map(|u| u * size).collect();
        let headings: Vec<f64> = rng.draw(n).into_iter().map(|u| TAU * u).collect();

        let birds = xs
            .into_iter()
            .zip(ys)
            .zip(headings)
            .map(|((x, y), heading)| Bird::new(x, y, heading))
            .collect();

        log::debug!("initialized {} birds in a {} x {} domain", n, size, size);
        Ok(Self { birds })
    }

    /// Explicit initial flock from index-aligned positions and headings.
    pub fn from_parts(
        positions: &[DVec2],
        headings: &[f64],
        params: &SimulationParameters,
    ) -> Result<Self> {
        params.validate()?;
        if headings.len() != params.num_birds {
            return Err(Error::StateMismatch {
                expected: params.num_birds,
                found: headings.len(),
            });
        }

        let birds: Vec<Bird> = positions
            .iter()
            .zip(headings)
            .map(|(p, &heading)| Bird::new(p.x, p.y, heading))
            .collect();

        let state = Self { birds };
        state.check(params)?;
        Ok(state)
    }

    /// Checks that the flock has exactly `N` birds, all finite.
    pub fn check(&self, params: &SimulationParameters) -> Result<()> {
        if self.birds.len() != params.num_birds {
            return Err(Error::StateMismatch {
                expected: params.num_birds,
                found: self.birds.len(),
            });
        }
        if let Some(index) = self.birds.iter().position(|b| !b.is_finite()) {
            return Err(Error::invalid(format!(
                "initial state of bird {index} is not finite"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.birds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.birds.is_empty()
    }

    pub fn positions(&self) -> Vec<DVec2> {
        self.birds.iter().map(|b| b.position).collect()
    }

    pub fn headings(&self) -> Vec<f64> {
        self.birds.iter().map(|b| b.heading).collect()
    }

    pub fn velocities(&self, speed: f64) -> Vec<DVec2> {
        self.birds.iter().map(|b| b.velocity(speed)).collect()
    }

    /// Vicsek order parameter: length of the mean unit heading vector.
    /// 1 for a perfectly aligned flock, near 0 for a disordered one.
    pub fn polarization(&self) -> f64 {
        if self.birds.is_empty() {
            return 0.0;
        }
        let sum: DVec2 = self
            .birds
            .iter()
            .map(|b| DVec2::new(b.heading.cos(), b.heading.sin()))
            .sum();
        sum.length() / self.birds.len() as f64
    }
}
