use proptest::prelude::*;
use rigid3d::{BoundVolume, Mat3, OverlapTable, Pose, Quat, RigidBody, Vec3};

fn vec3(range: f64) -> impl Strategy<Value = Vec3> {
    (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn orientation_stays_unit(
        omega in vec3(20.0),
        torque in vec3(5.0),
        inertia in (0.1f64..10.0, 0.1f64..10.0, 0.1f64..10.0),
        steps in 1usize..200,
        dt in 0.001f64..0.1,
    ) {
        let inertia = Mat3::from_diagonal(&Vec3::new(inertia.0, inertia.1, inertia.2));
        let mut body = RigidBody::new(1.0, &inertia).unwrap().with_angular_velocity(omega);
        body.add_inputs(Vec3::zeros(), torque);
        for _ in 0..steps {
            body.update(dt);
            prop_assert!((body.orientation().into_inner().norm() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn fixed_body_never_moves(
        impulses in prop::collection::vec((vec3(100.0), vec3(2.0)), 0..20),
        force in vec3(50.0),
    ) {
        let start = Vec3::new(1.0, 2.0, 3.0);
        let mut body = RigidBody::new(3.0, &Mat3::identity()).unwrap().with_position(start);
        body.fix();
        body.add_inputs(force, force);
        body.add_acceleration(Vec3::new(0.0, 0.0, -9.8));
        for (impulse, r) in &impulses {
            body.enact_impulse(impulse, r);
            body.update(0.05);
        }
        prop_assert_eq!(body.position(), start);
        prop_assert_eq!(body.orientation(), Quat::identity());
    }

    #[test]
    fn sphere_bounds_overlap_by_distance(
        a in vec3(10.0),
        b in vec3(10.0),
        ra in 0.1f64..5.0,
        rb in 0.1f64..5.0,
    ) {
        let table = OverlapTable::default();
        let mut va = BoundVolume::sphere(ra);
        let mut vb = BoundVolume::sphere(rb);
        va.update(&Pose::new(a, Quat::identity()));
        vb.update(&Pose::new(b, Quat::identity()));
        let expected = (a - b).norm_squared() <= (ra + rb) * (ra + rb);
        prop_assert_eq!(table.overlaps(&va, &vb).unwrap(), expected);
        prop_assert_eq!(table.overlaps(&vb, &va).unwrap(), expected);
    }
}
