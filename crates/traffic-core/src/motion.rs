//! Per-tick movement of a car along its path.

use crate::models::Car;
use crate::spatial::{haversine_distance, lerp};

/// Slack when comparing the distance budget against the rest of a leg (meters).
const SNAP_EPSILON_M: f64 = 1e-6;
/// Slack relative to the leg length, for accumulated rounding on long legs
const SNAP_EPSILON_REL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still on the way
    Moving,
    /// Last path point reached
    Arrived,
}

/// Move `car` by `speed * dt` meters along its path.
///
/// Progress on the current leg is kept in meters of the leg's haversine
/// length, so consecutive partial steps add up exactly to the leg. Whole
/// legs the budget covers snap the car onto the next point and advance the
/// index; what is left places the car that far along the straight chord of
/// the following leg. A car already at its last point arrives without moving.
pub fn advance(car: &mut Car, dt: f64) -> StepOutcome {
    if car.at_end() {
        return StepOutcome::Arrived;
    }

    let mut budget = (car.speed_mps * dt).max(0.0);
    while let Some(next) = car.next_point() {
        let from = car.path[car.path_index];
        let leg = haversine_distance(from, next);
        let remaining = (leg - car.leg_progress_m).max(0.0);
        let slack = SNAP_EPSILON_M.max(leg * SNAP_EPSILON_REL);
        if budget + slack >= remaining {
            car.position = next;
            car.path_index += 1;
            car.leg_progress_m = 0.0;
            budget -= remaining;
            if budget <= SNAP_EPSILON_M {
                break;
            }
        } else {
            car.leg_progress_m += budget;
            car.position = lerp(from, next, car.leg_progress_m / leg);
            break;
        }
    }

    if car.at_end() {
        StepOutcome::Arrived
    } else {
        StepOutcome::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use crate::spatial::{path_length_m, LocalFrame, EARTH_RADIUS_M};

    const START: Coordinate = Coordinate::new(52.52, 13.405);

    /// Point `meters` due north of `from`, exact under the haversine metric.
    fn north_of(from: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(from.lat + (meters / EARTH_RADIUS_M).to_degrees(), from.lng)
    }

    fn car_on(path: Vec<Coordinate>, speed_mps: f64) -> Car {
        Car {
            id: "car".to_string(),
            position: path[0],
            destination: *path.last().unwrap(),
            path,
            path_index: 0,
            leg_progress_m: 0.0,
            speed_mps,
        }
    }

    #[test]
    fn covering_budget_snaps_to_next_point() {
        let a = START;
        let b = north_of(a, 100.0);
        let c = north_of(b, 100.0);
        let mut car = car_on(vec![a, b, c], 10.0);

        assert_eq!(advance(&mut car, 10.0), StepOutcome::Moving);
        assert_eq!(car.path_index, 1);
        assert_eq!(car.position, b);
    }

    #[test]
    fn partial_budget_moves_along_chord() {
        let a = START;
        let b = north_of(a, 100.0);
        let mut car = car_on(vec![a, b], 10.0);

        assert_eq!(advance(&mut car, 2.5), StepOutcome::Moving);
        assert_eq!(car.path_index, 0);
        let moved = haversine_distance(a, car.position);
        assert!((moved - 25.0).abs() < 1e-6, "moved {moved}m");
    }

    #[test]
    fn leftover_budget_carries_past_short_legs() {
        let a = START;
        let b = north_of(a, 5.0);
        let c = north_of(b, 5.0);
        let d = north_of(c, 100.0);
        let mut car = car_on(vec![a, b, c, d], 20.0);

        advance(&mut car, 1.0);
        assert_eq!(car.path_index, 2);
        assert!((haversine_distance(c, car.position) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn already_at_end_arrives_without_moving() {
        let mut car = car_on(vec![START], 10.0);
        assert_eq!(advance(&mut car, 1.0), StepOutcome::Arrived);
        assert_eq!(car.position, START);
    }

    #[test]
    fn arrival_within_ceil_of_length_over_stride() {
        let speed = 7.0;
        let dt = 1.5;
        let mut path = vec![START];
        for leg in [33.0, 12.5, 80.0, 4.0, 61.0] {
            let last = *path.last().unwrap();
            path.push(north_of(last, leg));
        }
        let length = path_length_m(&path);
        let bound = (length / (speed * dt)).ceil() as usize;
        let mut car = car_on(path, speed);

        let mut ticks = 0;
        loop {
            ticks += 1;
            if advance(&mut car, dt) == StepOutcome::Arrived {
                break;
            }
            assert!(ticks <= bound, "still moving after {ticks} ticks");
        }
        assert!(ticks <= bound);
        assert!(car.at_end());
    }

    /// Ticks until arrival, failing once `limit` ticks have passed.
    fn ticks_to_arrive(car: &mut Car, dt: f64, limit: usize) -> usize {
        for tick in 1..=limit {
            if advance(car, dt) == StepOutcome::Arrived {
                return tick;
            }
        }
        panic!("car still moving after {limit} ticks");
    }

    #[test]
    fn diagonal_legs_arrive_on_exact_tick_count() {
        let origin = Coordinate::new(53.219, 63.635);
        let frame = LocalFrame::new(origin);
        let speed = 10.0;
        for (x, y, ticks) in [
            (-700.0, -700.0, 7),
            (700.0, -700.0, 7),
            (-2_500.0, -2_500.0, 50),
            (1_800.0, 900.0, 13),
        ] {
            let path = vec![origin, frame.unproject(x, y)];
            let length = path_length_m(&path);
            let dt = length / (speed * ticks as f64);
            let mut car = car_on(path, speed);

            assert_eq!(ticks_to_arrive(&mut car, dt, ticks), ticks, "leg ({x}, {y})");
            assert!(car.at_end());
        }
    }

    #[test]
    fn multi_leg_diagonal_path_meets_tick_bound() {
        let origin = Coordinate::new(43.238, 76.945);
        let frame = LocalFrame::new(origin);
        let path = vec![
            origin,
            frame.unproject(300.0, -450.0),
            frame.unproject(-200.0, -900.0),
            frame.unproject(-650.0, -1_200.0),
        ];
        let speed = 12.5;
        let ticks = 40;
        let dt = path_length_m(&path) / (speed * ticks as f64);
        let mut car = car_on(path, speed);

        assert_eq!(ticks_to_arrive(&mut car, dt, ticks), ticks);
    }

    #[test]
    fn partial_steps_stay_on_the_leg_chord() {
        let a = Coordinate::new(53.219, 63.635);
        let b = LocalFrame::new(a).unproject(-400.0, -400.0);
        let mut car = car_on(vec![a, b], 10.0);

        advance(&mut car, 4.0);
        advance(&mut car, 6.0);
        assert!((car.leg_progress_m - 100.0).abs() < 1e-9);
        let leg = haversine_distance(a, b);
        let expected = lerp(a, b, 100.0 / leg);
        assert!(haversine_distance(expected, car.position) < 1e-6);
    }

    #[test]
    fn replacing_path_restarts_leg_progress() {
        let b = north_of(START, 100.0);
        let mut car = car_on(vec![START, b], 10.0);
        advance(&mut car, 3.0);
        assert!(car.leg_progress_m > 0.0);

        car.replace_path(vec![car.position, north_of(b, 50.0)]);
        assert_eq!(car.leg_progress_m, 0.0);
        assert_eq!(car.path_index, 0);
    }

    #[test]
    fn stationary_car_stays_put() {
        let b = north_of(START, 50.0);
        let mut car = car_on(vec![START, b], 0.0);
        assert_eq!(advance(&mut car, 1.0), StepOutcome::Moving);
        assert_eq!(car.position, START);
        assert_eq!(car.path_index, 0);
    }
}
