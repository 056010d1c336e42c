//! Liquid-metal convection correlations.

use crate::materials::MaterialProperties;

/// Lyon-Martinelli Nusselt number for liquid metals.
pub fn nusselt(peclet: f64) -> f64 {
    4.82 + 0.0185 * peclet.max(0.0).powf(0.827)
}

/// Péclet number from mass flux: Pe = G·Dh·cp / k.
pub fn peclet(mass_flow: f64, flow_area: f64, hydraulic_diameter: f64, cp: f64, k: f64) -> f64 {
    if flow_area <= 0.0 || k <= 0.0 {
        return 0.0;
    }
    mass_flow / flow_area * hydraulic_diameter * cp / k
}

/// Film coefficient [W/(m²·K)] for a channel at temperature `t`.
pub fn film_coefficient(
    coolant: &dyn MaterialProperties,
    t: f64,
    mass_flow: f64,
    flow_area: f64,
    hydraulic_diameter: f64,
) -> f64 {
    let cp = coolant.heat_capacity(t);
    let k = coolant.thermal_conductivity(t);
    let pe = peclet(mass_flow, flow_area, hydraulic_diameter, cp, k);
    nusselt(pe) * k / hydraulic_diameter
}

/// Series conductance of a film and half a wall thickness [W/(m²·K)].
pub fn wall_conductance(film: f64, half_thickness: f64, k_wall: f64) -> f64 {
    if film <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 / film + half_thickness / k_wall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialLibrary;

    #[test]
    fn test_nusselt_laminar_limit() {
        assert!((nusselt(0.0) - 4.82).abs() < 1e-12);
        assert!(nusselt(200.0) > nusselt(100.0));
    }

    #[test]
    fn test_sodium_film_coefficient_order_of_magnitude() {
        let lib = MaterialLibrary::with_builtins().unwrap();
        let na = lib.get("sodium").unwrap();
        // 25 kg/s through 5e-3 m² with Dh = 3 mm.
        let h = film_coefficient(na.as_ref(), 700.0, 25.0, 5e-3, 3e-3);
        assert!(h > 5e4 && h < 5e5, "h = {h}");
    }

    #[test]
    fn test_wall_conductance_series() {
        let u = wall_conductance(1e4, 0.002, 20.0);
        // 1/(1e-4 + 1e-4)
        assert!((u - 5000.0).abs() < 1e-9);
        assert_eq!(wall_conductance(0.0, 0.002, 20.0), 0.0);
    }
}
