//! Minimal 2D rigid-body stepper
//!
//! Dynamic bodies are circles; static geometry is circles and thick
//! segments. Game code hooks in at two points:
//! - a [`MotionPolicy`] per body, which overrides velocity before integration
//! - begin handlers per ordered collision-type pair, which decide whether a
//!   new contact gets a physical response
//!
//! A handler's verdict holds until the shapes separate, so a rejected
//! contact stays rejected while the shapes keep overlapping.
//!
//! Each step runs as a few equal substeps. Within a substep the contact
//! solve repeats a few times and always ends with the fixture pass, so
//! static geometry has the last word on positions. A body already pushed
//! out of a fixture acts as immovable for the rest of that substep, and
//! segment contacts keep bodies on the side they started the substep on.

use std::collections::BTreeMap;

use glam::Vec2;

use super::collision::{CollisionResult, circle_circle, circle_segment_swept};

/// Substeps per [`Space::step`] unless configured otherwise
pub const DEFAULT_SUBSTEPS: u32 = 4;

/// Body-then-fixture contact passes per substep
const SOLVER_ITERATIONS: usize = 4;

/// Collision category of a body or fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionType(pub u8);

/// Stable index of a body inside its [`Space`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub usize);

/// Integrated motion state of a body
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
}

impl Kinematics {
    /// Default velocity update: keep `damping^dt` of the current velocity
    ///
    /// `damping` is the fraction of velocity left after one second, so 1.0
    /// never slows down and 0.0 stops the body on the spot.
    pub fn update_velocity(&mut self, damping: f32, dt: f32) {
        let keep = damping.powf(dt);
        self.velocity *= keep;
        self.angular_velocity *= keep;
    }
}

/// Per-body velocity override, run once per substep before integration
pub trait MotionPolicy {
    fn update_velocity(&mut self, kinematics: &mut Kinematics, damping: f32, dt: f32);
}

/// Moment of inertia of a solid disc
#[inline]
pub fn moment_for_circle(mass: f32, radius: f32) -> f32 {
    mass * radius * radius / 2.0
}

/// A dynamic circular body carrying its game-side policy `P`
#[derive(Debug, Clone)]
pub struct Body<P> {
    pub kinematics: Kinematics,
    pub mass: f32,
    pub moment: f32,
    pub radius: f32,
    pub elasticity: f32,
    pub collision_type: CollisionType,
    pub policy: P,
}

impl<P> Body<P> {
    pub fn circle(mass: f32, radius: f32, collision_type: CollisionType, policy: P) -> Self {
        Self {
            kinematics: Kinematics::default(),
            mass,
            moment: moment_for_circle(mass, radius),
            radius,
            elasticity: 0.0,
            collision_type,
            policy,
        }
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_pose(mut self, position: Vec2, angle: f32) -> Self {
        self.kinematics.position = position;
        self.kinematics.angle = angle;
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.kinematics.position
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.kinematics.velocity
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.kinematics.angle
    }
}

/// Static shape geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureShape {
    /// Segment from `a` to `b`, thickened by `radius`
    Segment { a: Vec2, b: Vec2, radius: f32 },
    Circle { center: Vec2, radius: f32 },
}

/// An immovable shape
#[derive(Debug, Clone)]
pub struct Fixture {
    pub shape: FixtureShape,
    pub elasticity: f32,
    pub collision_type: CollisionType,
}

impl Fixture {
    pub fn segment(a: Vec2, b: Vec2, radius: f32, collision_type: CollisionType) -> Self {
        Self {
            shape: FixtureShape::Segment { a, b, radius },
            elasticity: 0.0,
            collision_type,
        }
    }

    pub fn circle(center: Vec2, radius: f32, collision_type: CollisionType) -> Self {
        Self {
            shape: FixtureShape::Circle { center, radius },
            elasticity: 0.0,
            collision_type,
        }
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    /// Center of a circular fixture, midpoint of a segment
    pub fn center(&self) -> Vec2 {
        match self.shape {
            FixtureShape::Segment { a, b, .. } => (a + b) / 2.0,
            FixtureShape::Circle { center, .. } => center,
        }
    }

    /// Contact with a circle that moved from `from` to `center` this substep
    fn contact(&self, from: Vec2, center: Vec2, radius: f32) -> CollisionResult {
        match self.shape {
            FixtureShape::Segment { a, b, radius: r } => {
                circle_segment_swept(from, center, radius, a, b, r)
            }
            FixtureShape::Circle { center: c, radius: r } => circle_circle(center, radius, c, r),
        }
    }
}

/// Begin handler for two bodies; returns whether the contact collides
pub type BodyHandler<P, C> = fn(&mut Body<P>, &mut Body<P>, &C) -> bool;

/// Begin handler for a body touching a fixture; returns whether the contact collides
pub type FixtureHandler<P, C> = fn(&mut Body<P>, &Fixture, &C) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ContactKey {
    Bodies(usize, usize),
    Fixture { body: usize, fixture: usize },
}

/// Simulation space: bodies, fixtures, handlers and live contacts.
///
/// `C` is the read-only context handed to every begin handler.
pub struct Space<P, C> {
    bodies: Vec<Body<P>>,
    fixtures: Vec<Fixture>,
    damping: f32,
    substeps: u32,
    body_handlers: Vec<(CollisionType, CollisionType, BodyHandler<P, C>)>,
    fixture_handlers: Vec<(CollisionType, CollisionType, FixtureHandler<P, C>)>,
    /// Contacts alive after the last step, with their verdict
    contacts: BTreeMap<ContactKey, bool>,
}

impl<P: MotionPolicy, C> Space<P, C> {
    pub fn new(damping: f32) -> Self {
        Self {
            bodies: Vec::new(),
            fixtures: Vec::new(),
            damping,
            substeps: DEFAULT_SUBSTEPS,
            body_handlers: Vec::new(),
            fixture_handlers: Vec::new(),
            contacts: BTreeMap::new(),
        }
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps.max(1);
        self
    }

    pub fn add_body(&mut self, body: Body<P>) -> BodyHandle {
        self.bodies.push(body);
        BodyHandle(self.bodies.len() - 1)
    }

    pub fn add_fixture(&mut self, fixture: Fixture) {
        self.fixtures.push(fixture);
    }

    pub fn body(&self, handle: BodyHandle) -> &Body<P> {
        &self.bodies[handle.0]
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut Body<P> {
        &mut self.bodies[handle.0]
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Register the begin handler for bodies of types `first` and `second`.
    ///
    /// The handler always receives the `first`-typed body first. Replaces
    /// any handler already registered for the pair.
    pub fn on_body_contact(
        &mut self,
        first: CollisionType,
        second: CollisionType,
        handler: BodyHandler<P, C>,
    ) {
        self.body_handlers
            .retain(|(a, b, _)| !(*a == first && *b == second));
        self.body_handlers.push((first, second, handler));
    }

    /// Register the begin handler for a `body_type` body touching a `fixture_type` fixture
    pub fn on_fixture_contact(
        &mut self,
        body_type: CollisionType,
        fixture_type: CollisionType,
        handler: FixtureHandler<P, C>,
    ) {
        self.fixture_handlers
            .retain(|(a, b, _)| !(*a == body_type && *b == fixture_type));
        self.fixture_handlers.push((body_type, fixture_type, handler));
    }

    /// Advance every body by `dt`, firing begin handlers for new contacts
    pub fn step(&mut self, dt: f32, ctx: &C) {
        let h = dt / self.substeps as f32;
        for _ in 0..self.substeps {
            self.substep(h, ctx);
        }
    }

    fn substep(&mut self, dt: f32, ctx: &C) {
        let damping = self.damping;
        for body in &mut self.bodies {
            body.policy.update_velocity(&mut body.kinematics, damping, dt);
        }

        let start: Vec<Vec2> = self.bodies.iter().map(Body::position).collect();
        for body in &mut self.bodies {
            let k = &mut body.kinematics;
            k.position += k.velocity * dt;
            k.angle += k.angular_velocity * dt;
        }

        let mut touching = BTreeMap::new();
        let mut pinned = vec![false; self.bodies.len()];
        for _ in 0..SOLVER_ITERATIONS {
            self.solve_bodies(&mut touching, &pinned, ctx);
            self.solve_fixtures(&start, &mut touching, &mut pinned, ctx);
        }
        self.contacts = touching;
    }

    fn solve_bodies(
        &mut self,
        touching: &mut BTreeMap<ContactKey, bool>,
        pinned: &[bool],
        ctx: &C,
    ) {
        for j in 1..self.bodies.len() {
            for i in 0..j {
                let (left, right) = self.bodies.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);

                if !circle_circle(a.position(), a.radius, b.position(), b.radius).hit {
                    continue;
                }

                let key = ContactKey::Bodies(i, j);
                let collide = match touching.get(&key).or_else(|| self.contacts.get(&key)) {
                    Some(&verdict) => verdict,
                    None => begin_bodies(&self.body_handlers, a, b, ctx),
                };
                touching.insert(key, collide);

                if collide {
                    // The handler may have moved either body
                    let hit = circle_circle(a.position(), a.radius, b.position(), b.radius);
                    if hit.hit {
                        resolve_bodies(a, b, pinned[i], pinned[j], &hit);
                    }
                }
            }
        }
    }

    fn solve_fixtures(
        &mut self,
        start: &[Vec2],
        touching: &mut BTreeMap<ContactKey, bool>,
        pinned: &mut [bool],
        ctx: &C,
    ) {
        for (body_idx, body) in self.bodies.iter_mut().enumerate() {
            for (fixture_idx, fixture) in self.fixtures.iter().enumerate() {
                let from = start[body_idx];
                if !fixture.contact(from, body.position(), body.radius).hit {
                    continue;
                }

                let key = ContactKey::Fixture {
                    body: body_idx,
                    fixture: fixture_idx,
                };
                let collide = match touching.get(&key).or_else(|| self.contacts.get(&key)) {
                    Some(&verdict) => verdict,
                    None => begin_fixture(&self.fixture_handlers, body, fixture, ctx),
                };
                touching.insert(key, collide);

                if collide {
                    let hit = fixture.contact(from, body.position(), body.radius);
                    if hit.hit {
                        resolve_fixture(body, fixture, &hit);
                        pinned[body_idx] = true;
                    }
                }
            }
        }
    }
}

fn begin_bodies<P, C>(
    handlers: &[(CollisionType, CollisionType, BodyHandler<P, C>)],
    a: &mut Body<P>,
    b: &mut Body<P>,
    ctx: &C,
) -> bool {
    let (ta, tb) = (a.collision_type, b.collision_type);
    if let Some((_, _, handler)) = handlers.iter().find(|(x, y, _)| *x == ta && *y == tb) {
        return handler(a, b, ctx);
    }
    if let Some((_, _, handler)) = handlers.iter().find(|(x, y, _)| *x == tb && *y == ta) {
        return handler(b, a, ctx);
    }
    true
}

fn begin_fixture<P, C>(
    handlers: &[(CollisionType, CollisionType, FixtureHandler<P, C>)],
    body: &mut Body<P>,
    fixture: &Fixture,
    ctx: &C,
) -> bool {
    handlers
        .iter()
        .find(|(x, y, _)| *x == body.collision_type && *y == fixture.collision_type)
        .is_none_or(|(_, _, handler)| handler(body, fixture, ctx))
}

/// Impulse plus position correction for two dynamic bodies.
///
/// A pinned body is treated as immovable.
fn resolve_bodies<P>(
    a: &mut Body<P>,
    b: &mut Body<P>,
    a_pinned: bool,
    b_pinned: bool,
    hit: &CollisionResult,
) {
    let inv_a = if a_pinned { 0.0 } else { 1.0 / a.mass };
    let inv_b = if b_pinned { 0.0 } else { 1.0 / b.mass };
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return;
    }
    let normal = hit.normal;

    let approach = (a.kinematics.velocity - b.kinematics.velocity).dot(normal);
    if approach < 0.0 {
        let restitution = a.elasticity * b.elasticity;
        let impulse = -(1.0 + restitution) * approach / inv_sum;
        a.kinematics.velocity += normal * (impulse * inv_a);
        b.kinematics.velocity -= normal * (impulse * inv_b);
    }

    let correction = normal * (hit.penetration / inv_sum);
    a.kinematics.position += correction * inv_a;
    b.kinematics.position -= correction * inv_b;
}

/// Reflect the normal velocity and push the body fully out of the fixture
fn resolve_fixture<P>(body: &mut Body<P>, fixture: &Fixture, hit: &CollisionResult) {
    let normal = hit.normal;
    let approach = body.kinematics.velocity.dot(normal);
    if approach < 0.0 {
        let restitution = body.elasticity * fixture.elasticity;
        body.kinematics.velocity -= normal * ((1.0 + restitution) * approach);
    }
    body.kinematics.position += normal * hit.penetration;
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const BALL: CollisionType = CollisionType(1);
    const BUMPER: CollisionType = CollisionType(2);
    const WALL: CollisionType = CollisionType(3);

    /// Plain damped motion, tagged so handlers can tell bodies apart
    struct Drift(u8);

    impl MotionPolicy for Drift {
        fn update_velocity(&mut self, kinematics: &mut Kinematics, damping: f32, dt: f32) {
            kinematics.update_velocity(damping, dt);
        }
    }

    fn ball(tag: u8, x: f32, vx: f32) -> Body<Drift> {
        let mut body = Body::circle(1.0, 0.1, BALL, Drift(tag)).with_pose(Vec2::new(x, 0.0), 0.0);
        body.kinematics.velocity = Vec2::new(vx, 0.0);
        body
    }

    #[test]
    fn test_integrates_without_damping() {
        let mut space: Space<Drift, ()> = Space::new(1.0);
        let h = space.add_body(ball(0, 0.0, 1.0));
        for _ in 0..10 {
            space.step(0.1, &());
        }
        assert!((space.body(h).position().x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_damping_stops_body() {
        let mut space: Space<Drift, ()> = Space::new(0.0);
        let h = space.add_body(ball(0, 0.0, 1.0));
        space.step(0.1, &());
        assert_eq!(space.body(h).velocity(), Vec2::ZERO);
        assert_eq!(space.body(h).position(), Vec2::ZERO);
    }

    #[test]
    fn test_wall_bounce_keeps_body_outside() {
        let mut space: Space<Drift, ()> = Space::new(1.0);
        let h = space.add_body(ball(0, 0.8, 2.0).with_elasticity(1.0));
        space.add_fixture(
            Fixture::segment(Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0), 0.01, WALL)
                .with_elasticity(0.5),
        );

        for _ in 0..30 {
            space.step(1.0 / 60.0, &());
            assert!(space.body(h).position().x <= 1.0 - 0.11 + 1e-4);
        }
        let v = space.body(h).velocity();
        assert!((v.x + 1.0).abs() < 1e-4, "bounced at half speed, got {v}");
    }

    #[test]
    fn test_fast_body_does_not_tunnel_thin_wall() {
        // Each of these moves well past the contact band in one substep
        for (speed, substeps) in [(4.0, 1), (60.0, DEFAULT_SUBSTEPS), (1000.0, 1)] {
            let mut space: Space<Drift, ()> = Space::new(1.0).with_substeps(substeps);
            let h = space.add_body(
                Body::circle(0.024, 0.02, BALL, Drift(0)).with_pose(Vec2::new(0.5, 0.0), 0.0),
            );
            space.body_mut(h).kinematics.velocity = Vec2::new(speed, 0.0);
            space.add_fixture(Fixture::segment(
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0, 1.0),
                0.01,
                WALL,
            ));

            for _ in 0..30 {
                space.step(1.0 / 60.0, &());
                let x = space.body(h).position().x;
                assert!(x <= 1.0 - 0.03 + 1e-4, "{speed} m/s crossed to x = {x}");
            }
            // Inelastic: stopped dead at the wall
            assert_eq!(space.body(h).velocity().x, 0.0);
        }
    }

    #[test]
    fn test_equal_mass_head_on_exchange() {
        let mut space: Space<Drift, ()> = Space::new(1.0);
        let a = space.add_body(ball(0, -0.12, 1.0).with_elasticity(1.0));
        let b = space.add_body(ball(1, 0.12, 0.0).with_elasticity(1.0));
        for _ in 0..10 {
            space.step(0.01, &());
        }
        assert!(space.body(a).velocity().x.abs() < 1e-4);
        assert!((space.body(b).velocity().x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejected_contact_stays_rejected_until_separation() {
        fn pass_through(_: &mut Body<Drift>, _: &mut Body<Drift>, calls: &Cell<u32>) -> bool {
            calls.set(calls.get() + 1);
            false
        }

        let calls = Cell::new(0);
        let mut space: Space<Drift, Cell<u32>> = Space::new(1.0);
        let a = space.add_body(ball(0, -0.3, 1.0));
        space.add_body(ball(1, 0.0, 0.0));
        space.on_body_contact(BALL, BALL, pass_through);

        // Overlap lasts several steps but the handler runs once
        for _ in 0..40 {
            space.step(0.01, &calls);
        }
        assert_eq!(calls.get(), 1);
        // No response: the moving ball kept its speed
        assert!((space.body(a).velocity().x - 1.0).abs() < 1e-6);
        assert!(space.body(a).position().x > 0.05);
    }

    #[test]
    fn test_handler_receives_registered_order() {
        fn check_order(first: &mut Body<Drift>, second: &mut Body<Drift>, seen: &Cell<u8>) -> bool {
            assert_eq!(first.collision_type, BUMPER);
            assert_eq!(second.collision_type, BALL);
            seen.set(first.policy.0);
            true
        }

        let seen = Cell::new(0);
        let mut space: Space<Drift, Cell<u8>> = Space::new(1.0);
        // Ball inserted before the bumper
        space.add_body(ball(1, 0.0, 0.0));
        let mut bumper = ball(7, 0.15, 0.0);
        bumper.collision_type = BUMPER;
        space.add_body(bumper);
        space.on_body_contact(BUMPER, BALL, check_order);

        space.step(0.01, &seen);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_fixture_handler_can_veto() {
        fn ghost(_: &mut Body<Drift>, _: &Fixture, _: &()) -> bool {
            false
        }

        let mut space: Space<Drift, ()> = Space::new(1.0);
        let h = space.add_body(ball(0, 0.0, 1.0));
        space.add_fixture(Fixture::circle(Vec2::new(0.5, 0.0), 0.1, WALL));
        space.on_fixture_contact(BALL, WALL, ghost);

        for _ in 0..100 {
            space.step(0.01, &());
        }
        assert!(space.body(h).position().x > 0.9);
    }
}
