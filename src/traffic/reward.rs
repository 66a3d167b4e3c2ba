use crate::engine::VehicleRecord;

/// Mean speed over the vehicles reporting a non-zero speed.
///
/// Missing and zero speeds are excluded rather than averaged in. When no
/// vehicle qualifies the reward is `0.0`.
pub fn mean_speed(records: &[VehicleRecord]) -> f32 {
    let (sum, count) = records
        .iter()
        .filter_map(|record| record.speed)
        .filter(|speed| *speed != 0.0)
        .fold((0.0_f64, 0_usize), |(sum, count), speed| {
            (sum + f64::from(speed), count + 1)
        });

    if count == 0 {
        return 0.0;
    }
    (sum / count as f64) as f32
}
