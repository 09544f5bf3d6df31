use rotordyn::{
    BearingElement, DiskElement, Material, Rotor, ShaftElement, Support, WhirlDirection,
};

const STEEL_E: f64 = 211e9;
const STEEL_RHO: f64 = 7810.0;
const ANALYTIC_REL_TOL: f64 = 0.01;

/// Six Timoshenko elements, two disks and two anisotropic bearings.
fn three_disk_style_rotor() -> Rotor {
    two_disk_rotor(0.8e6)
}

fn two_disk_rotor(kyy: f64) -> Rotor {
    const ELEMENT_LENGTH: f64 = 0.25;
    const OD: f64 = 0.05;
    let steel = Material::steel();
    let shafts = (0..6)
        .map(|n| ShaftElement::timoshenko(n, ELEMENT_LENGTH, 0.0, OD, steel.clone()).unwrap())
        .collect();
    let disks = vec![
        DiskElement::from_geometry(2, &steel, 0.07, 0.05, 0.28).unwrap(),
        DiskElement::from_geometry(4, &steel, 0.07, 0.05, 0.35).unwrap(),
    ];
    let bearings = vec![
        BearingElement::new(0, 1e6, 0.0).with_kyy(kyy),
        BearingElement::new(6, 1e6, 0.0).with_kyy(kyy),
    ];
    Rotor::from_parts(shafts, disks, bearings).unwrap()
}

fn beam_scale(length: f64, od: f64) -> f64 {
    let ei = STEEL_E * std::f64::consts::PI * od.powi(4) / 64.0;
    let rho_a = STEEL_RHO * std::f64::consts::PI * od * od / 4.0;
    (ei / (rho_a * length.powi(4))).sqrt()
}

#[test]
fn simply_supported_shaft_first_bending_frequency() {
    const LENGTH: f64 = 1.0;
    const OD: f64 = 0.05;
    const N_ELEMENTS: usize = 10;
    let steel = Material::new("steel", STEEL_RHO, STEEL_E, 0.3).unwrap();
    let rotor = Rotor::uniform_shaft(LENGTH, 0.0, OD, steel, N_ELEMENTS, false)
        .unwrap()
        .with_support(0, Support::Pinned)
        .unwrap()
        .with_support(N_ELEMENTS, Support::Pinned)
        .unwrap();

    let expected = std::f64::consts::PI.powi(2) * beam_scale(LENGTH, OD);
    let wn = rotor.modal(0.0, 1).unwrap().modes[0].wn;
    assert!(
        ((wn - expected) / expected).abs() < ANALYTIC_REL_TOL,
        "simply supported: got {wn}, expected {expected}"
    );
}

#[test]
fn cantilever_shaft_first_bending_frequency() {
    const LENGTH: f64 = 1.0;
    const OD: f64 = 0.05;
    const N_ELEMENTS: usize = 10;
    const BETA_L: f64 = 1.875_104;
    let steel = Material::new("steel", STEEL_RHO, STEEL_E, 0.3).unwrap();
    let rotor = Rotor::uniform_shaft(LENGTH, 0.0, OD, steel, N_ELEMENTS, false)
        .unwrap()
        .with_support(0, Support::Fixed)
        .unwrap();

    let expected = BETA_L * BETA_L * beam_scale(LENGTH, OD);
    let wn = rotor.modal(0.0, 1).unwrap().modes[0].wn;
    assert!(
        ((wn - expected) / expected).abs() < ANALYTIC_REL_TOL,
        "cantilever: got {wn}, expected {expected}"
    );
}

#[test]
fn gyroscopic_stiffening_splits_forward_and_backward_curves() {
    let rotor = three_disk_style_rotor();
    let campbell = rotor.campbell(&[0.0, 150.0, 300.0], 4).unwrap();
    let f = &campbell.frequencies;

    assert!((f[(0, 0)] - 82.653).abs() < 0.5);
    assert!((f[(1, 0)] - 86.658).abs() < 0.5);

    for i in 1..3 {
        assert_eq!(campbell.whirl[i][0], WhirlDirection::Backward);
        assert_eq!(campbell.whirl[i][1], WhirlDirection::Forward);
        assert!(f[(0, i)] < f[(0, i - 1)], "backward curve must fall");
        assert!(f[(1, i)] > f[(1, i - 1)], "forward curve must rise");
    }
    // stable everywhere without cross coupling
    assert!(campbell.damping.iter().all(|z| *z > -1e-6));
}

#[test]
fn first_forward_critical_speed() {
    let rotor = three_disk_style_rotor();
    let speeds = [0.0, 50.0, 100.0, 150.0];

    let coarse = rotor.campbell(&speeds, 4).unwrap().critical_speeds();
    assert_eq!(coarse.len(), 1);
    assert_eq!(coarse[0].mode, 1);

    let refined = rotor.critical_speeds(&speeds, 4).unwrap();
    assert_eq!(refined.len(), 1);
    let crit = refined[0];
    assert!(crit.speed > 86.0 && crit.speed < 87.5, "critical speed {}", crit.speed);
    assert!((crit.frequency - crit.speed).abs() < 1e-3);
    assert!((coarse[0].speed - crit.speed).abs() < 0.5);
}

#[test]
fn rotation_sense_flips_whirl_classification() {
    use rotordyn::{AnalysisConfig, RotationSense};

    let forward = three_disk_style_rotor().modal(300.0, 2).unwrap();
    let config = AnalysisConfig::default().with_rotation_sense(RotationSense::YToX);
    let flipped = Rotor::with_config(three_disk_style_rotor().elements().to_vec(), config)
        .unwrap()
        .modal(300.0, 2)
        .unwrap();

    for (a, b) in forward.modes.iter().zip(&flipped.modes) {
        assert!((a.wn - b.wn).abs() < 1e-9 * a.wn);
        assert!((a.kappa + b.kappa).abs() < 1e-9);
    }
}

#[test]
fn isotropic_rotor_reports_only_forward_critical_speeds() {
    const SPEEDS: [f64; 2] = [0.0, 400.0];
    let rotor = two_disk_rotor(1e6);
    let campbell = rotor.campbell(&SPEEDS, 4).unwrap();

    assert!(
        campbell.whirl[0].iter().all(|w| *w == WhirlDirection::Planar),
        "repeated modes at rest: {:?}",
        campbell.whirl[0]
    );

    let coarse = campbell.critical_speeds();
    let refined = rotor.critical_speeds(&SPEEDS, 4).unwrap();
    assert_eq!(coarse.len(), refined.len());
    for crit in coarse.iter().chain(&refined) {
        assert_eq!(
            campbell.whirl[1][crit.mode],
            WhirlDirection::Forward,
            "critical speed {crit:?} on a non-forward curve"
        );
        let curve = campbell.curve(crit.mode).unwrap();
        assert!(curve[1] > curve[0], "forward curve must rise");
    }
}
