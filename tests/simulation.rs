//! End-to-end scenarios driven through `Universe::step`.

use rigid3d::{
    Body, BodyConfig, BodyId, IntegrationMode, Manifold, Material, PhysicsError, Potential,
    ResolutionMode, SimConfig, Universe, Vec3,
};

const EPSILON: f64 = 1e-9;

fn approx_vec_eq(a: &Vec3, b: &Vec3) -> bool {
    (a - b).norm() < EPSILON
}

fn ball(position: Vec3, velocity: Vec3) -> Body {
    Body::ball(
        1.0,
        8,
        BodyConfig::new(1.0).with_position(position).with_velocity(velocity),
    )
    .unwrap()
}

#[test]
fn test_equal_mass_elastic_collision_exchanges_velocities() {
    let elastic = Material::frictionless(20.0);
    let bodies = vec![
        ball(Vec3::zeros(), Vec3::x()).with_material(elastic),
        ball(Vec3::new(2.05, 0.0, 0.0), Vec3::zeros()).with_material(elastic),
    ];
    let mut universe = Universe::new(bodies, SimConfig::default()).unwrap();
    let energy = universe.total_kinetic_energy();

    universe.step(0.1).unwrap();

    assert!(approx_vec_eq(&universe.bodies()[0].rigid().velocity(), &Vec3::zeros()));
    assert!(approx_vec_eq(&universe.bodies()[1].rigid().velocity(), &Vec3::x()));
    assert!((universe.total_kinetic_energy() - energy).abs() < EPSILON);

    // They keep separating afterwards
    for _ in 0..10 {
        universe.step(0.1).unwrap();
    }
    assert!(approx_vec_eq(&universe.bodies()[0].rigid().velocity(), &Vec3::zeros()));
    assert!(universe.bodies()[1].position().x > 3.0);
}

#[test]
fn test_momentum_conserved_in_inelastic_collision() {
    let bodies = vec![
        ball(Vec3::zeros(), Vec3::new(2.0, 0.0, 0.0)),
        ball(Vec3::new(2.1, 0.0, 0.0), Vec3::zeros()),
    ];
    let mut universe = Universe::new(bodies, SimConfig::default()).unwrap();
    universe.step(0.1).unwrap();
    let total: Vec3 = universe.bodies().iter().map(|b| b.rigid().momentum()).sum();
    assert!(approx_vec_eq(&total, &Vec3::new(2.0, 0.0, 0.0)));
    assert!(universe.bodies()[1].rigid().velocity().x > 0.0);
}

#[test]
fn test_construction_fails_on_overlap() {
    let bodies = vec![
        Body::wall(Vec3::zeros(), Vec3::z(), 4.0, 4.0).unwrap(),
        ball(Vec3::new(0.3, 0.2, 0.5), Vec3::zeros()),
    ];
    assert!(matches!(
        Universe::new(bodies, SimConfig::default()),
        Err(PhysicsError::InitialOverlap { .. })
    ));
}

#[test]
fn test_ball_stays_inside_room() {
    let mut bodies = Body::room(Vec3::zeros(), 6.0, 6.0, 6.0).unwrap();
    bodies.push(ball(Vec3::new(0.1, 0.2, 0.0), Vec3::new(1.0, 0.5, 0.0)));
    let id = BodyId(bodies.len() - 1);
    let mut universe = Universe::new(bodies, SimConfig::default()).unwrap();
    universe.set_gravity(9.8);

    for _ in 0..300 {
        universe.step(0.01).unwrap();
        let p = universe.body(id).unwrap().position();
        assert!(p.z > -3.0);
        assert!(p.x.abs() < 3.0 && p.y.abs() < 3.0);
    }
    // The floor stopped the fall within one probe-ray length
    assert!(universe.body(id).unwrap().position().z > -2.5);
}

#[test]
fn test_bead_on_inclined_line() {
    let line = Manifold::Line {
        point: Vec3::zeros(),
        direction: Vec3::new(1.0, 0.0, -1.0),
    };
    let bead = Body::ball(0.1, 4, BodyConfig::new(1.0).with_manifold(line.clone())).unwrap();
    let mut universe = Universe::new(vec![bead], SimConfig::default()).unwrap();
    universe.set_gravity(9.8);

    for _ in 0..50 {
        universe.step(0.02).unwrap();
        let p = universe.bodies()[0].position();
        assert!(line.contains(&p));
        let v = universe.bodies()[0].rigid().velocity();
        assert!(v.y.abs() < EPSILON);
        assert!((v.x + v.z).abs() < EPSILON);
    }
    assert!(universe.bodies()[0].position().x > 0.0);
}

#[test]
fn test_rotation_axis_keeps_spin_axis() {
    let config = BodyConfig::new(1.0).with_rotation_axis(Vec3::z(), 2.0);
    let wheel = Body::cylinder(1.0, 0.2, 8, config).unwrap();
    let mut universe = Universe::new(vec![wheel], SimConfig::default()).unwrap();
    universe
        .body_mut(BodyId(0))
        .unwrap()
        .rigid_mut()
        .add_inputs(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0));

    for _ in 0..20 {
        universe.step(0.05).unwrap();
    }
    let omega = universe.bodies()[0].rigid().angular_velocity();
    assert!(omega.z > 0.0);
    assert!(omega.x.abs() < EPSILON && omega.y.abs() < EPSILON);
}

#[test]
fn test_orbit_around_tracked_potential() {
    // Heavy fixed-position sun, light planet on a circular orbit: v² = k / r
    let sun = Body::ball(0.5, 4, BodyConfig::new(1000.0).with_fixed_position()).unwrap();
    let planet = ball(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
    let mut universe = Universe::new(vec![sun, planet], SimConfig::default()).unwrap();
    universe
        .add_body_potential(BodyId(0), Potential::inverse_square(10.0))
        .unwrap();

    for _ in 0..1000 {
        universe.step(0.01).unwrap();
    }
    let r = universe.bodies()[1].position().norm();
    assert!((r - 10.0).abs() < 0.5);
    assert_eq!(universe.bodies()[0].position(), Vec3::zeros());
}

#[test]
fn test_sharded_integration_lands_balls_on_floor() {
    let config = SimConfig::default()
        .with_integration(IntegrationMode::Sharded)
        .with_resolution(ResolutionMode::iterative());
    let mut bodies = vec![Body::wall(Vec3::zeros(), Vec3::z(), 20.0, 20.0).unwrap()];
    for i in 0..4 {
        bodies.push(ball(Vec3::new(-4.5 + 3.0 * i as f64, 0.3, 2.0 + i as f64), Vec3::zeros()));
    }
    let mut universe = Universe::new(bodies, config).unwrap();
    universe.set_gravity(9.8);
    for _ in 0..200 {
        universe.step(0.01).unwrap();
    }
    for body in &universe.bodies()[1..] {
        let z = body.position().z;
        assert!(z > 0.5 && z < 1.2, "ball resting at z = {}", z);
    }
    assert!((universe.elapsed() - 2.0).abs() < 1e-9);
}
