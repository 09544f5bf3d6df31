use nalgebra::DVector;
use rotordyn::assembly::{assemble_dense, local_matrices, MatrixKind};
use rotordyn::{
    rotor_example, AnalysisConfig, BearingElement, BearingTable, Element, Error, HarmonicForce,
    InitialConditions, LoadHistory, Material, Rotor, ShaftElement, SpeedSchedule,
    TimeIntegration,
};

const SYMMETRY_TOL: f64 = 1e-9;

#[test]
fn zero_speed_system_matches_summed_elements() {
    let rotor = rotor_example().unwrap();
    let elements: Vec<Element> = rotor.elements().to_vec();
    let locals = local_matrices(&elements, 0.0).unwrap();
    let n = rotor.n_dofs();

    let sys = rotor.system_matrices(0.0).unwrap();
    assert_eq!(sys.m, assemble_dense(n, &locals, MatrixKind::Mass).unwrap());
    assert_eq!(sys.k, assemble_dense(n, &locals, MatrixKind::Stiffness).unwrap());
    assert_eq!(sys.velocity_matrix(0.0), sys.c);

    for i in 0..n {
        for j in 0..n {
            let scale = sys.k[(i, j)].abs().max(1.0);
            assert!((sys.k[(i, j)] - sys.k[(j, i)]).abs() < SYMMETRY_TOL * scale);
            assert!((sys.m[(i, j)] - sys.m[(j, i)]).abs() < SYMMETRY_TOL);
        }
    }
}

#[test]
fn static_frequency_response_is_stiffness_solve() {
    const FORCE_DOF: usize = 5;
    let rotor = rotor_example().unwrap();
    let resp = rotor
        .frequency_response(
            &[HarmonicForce::new(FORCE_DOF, 2.0, 0.0)],
            &[0.0],
            &[],
            SpeedSchedule::Fixed(0.0),
        )
        .unwrap();

    let k = rotor.system_matrices(0.0).unwrap().k;
    let mut f = DVector::<f64>::zeros(rotor.n_dofs());
    f[FORCE_DOF] = 2.0;
    let x = k.lu().solve(&f).expect("bearing-supported rotor is not singular");
    let mag = resp.magnitude();
    for dof in 0..rotor.n_dofs() {
        assert!((mag[(dof, 0)] - x[dof].abs()).abs() <= 1e-8 * x.amax());
    }
}

#[test]
fn speed_dependent_bearing_table_round_trip() {
    let json = r#"{
        "speed": [0.0, 500.0, 1000.0],
        "kxx": [1.0e6, 1.5e6, 2.0e6],
        "cxx": [100.0, 150.0, 200.0]
    }"#;
    let table = BearingTable::from_json(json).unwrap();
    let steel = Material::steel();
    let shafts: Vec<Element> = ShaftElement::timoshenko(0, 0.5, 0.0, 0.05, steel)
        .unwrap()
        .split(2)
        .unwrap()
        .into_iter()
        .map(Element::from)
        .collect();
    let mut elements = shafts;
    elements.push(BearingElement::from_table(0, &table).unwrap().into());
    elements.push(BearingElement::from_table(2, &table).unwrap().into());
    let rotor = Rotor::new(elements).unwrap();

    let low = rotor.modal(100.0, 2).unwrap();
    let high = rotor.modal(900.0, 2).unwrap();
    assert!(high.modes[0].wn > low.modes[0].wn);
    assert!(matches!(rotor.modal(1200.0, 2), Err(Error::OutOfRange { .. })));
}

#[test]
fn configuration_from_json_controls_whirl_reference() {
    let config = AnalysisConfig::from_json(r#"{ "reference_node": 1 }"#).unwrap();
    assert_eq!(config.reference_node, Some(1));
    let elements = rotor_example().unwrap().elements().to_vec();
    assert!(Rotor::with_config(elements.clone(), config).is_ok());

    let bad = AnalysisConfig::default().with_reference_node(9);
    assert!(matches!(
        Rotor::with_config(elements, bad),
        Err(Error::InvalidTopology(_))
    ));
}

#[test]
fn newmark_step_load_settles_to_static_deflection() {
    const FORCE_DOF: usize = 4;
    const FORCE: f64 = 50.0;
    let steel = Material::steel();
    let shafts: Vec<ShaftElement> = (0..2)
        .map(|n| ShaftElement::timoshenko(n, 0.25, 0.0, 0.05, steel.clone()).unwrap())
        .collect();
    let bearings = vec![
        BearingElement::new(0, 1e6, 2000.0),
        BearingElement::new(2, 1e6, 2000.0),
    ];
    let rotor = Rotor::from_parts(shafts, vec![], bearings).unwrap();

    let time: Vec<f64> = (0..=4000).map(|i| i as f64 * 5e-4).collect();
    let load = LoadHistory::from_fn(FORCE_DOF, &time, |_| FORCE);
    let resp = rotor
        .time_response(
            0.0,
            &[load],
            &time,
            &InitialConditions::at_rest(),
            &[FORCE_DOF],
            TimeIntegration::Newmark,
        )
        .unwrap();

    let k = rotor.system_matrices(0.0).unwrap().k;
    let mut f = DVector::<f64>::zeros(rotor.n_dofs());
    f[FORCE_DOF] = FORCE;
    let x_static = k.lu().solve(&f).unwrap()[FORCE_DOF];
    let x_end = *resp.displacement_of(FORCE_DOF).unwrap().last().unwrap();
    assert!(
        ((x_end - x_static) / x_static).abs() < 1e-2,
        "end {x_end} vs static {x_static}"
    );
}
