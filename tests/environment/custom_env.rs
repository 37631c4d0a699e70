use scoped_fixtures::{sf, Env, Environment, FixtureOptions, FixtureState, TestHandle, TestScope};
use std::sync::Arc;

/// Environment with per-test context a fixture can read.
struct ServiceEnv {
    env: Environment,
    region: String,
}

impl ServiceEnv {
    fn new(t: Arc<dyn TestHandle>, state: Arc<FixtureState>, region: &str) -> Self {
        Self {
            env: Environment::with_state(t, state),
            region: region.to_string(),
        }
    }
}

impl Env for ServiceEnv {
    fn environment(&self) -> &Environment {
        &self.env
    }
}

fn endpoint(env: &ServiceEnv) -> String {
    env.environment()
        .cache(&env.region, FixtureOptions::default(), || {
            Ok(format!("https://{}.service.test", env.region))
        })
}

#[test]
fn custom_env_reaches_fixtures() {
    let state = FixtureState::new();

    TestScope::run("Custom", |t| {
        let env = ServiceEnv::new(t.clone(), Arc::clone(&state), "eu-west");
        assert_eq!(endpoint(&env), "https://eu-west.service.test");
        assert_eq!(env.t().name(), "Custom");

        // Stock fixtures accept any environment.
        let dir = sf::temp_dir(&env);
        assert!(dir.is_dir());
        assert_eq!(sf::temp_dir(&env), dir);
    });

    assert!(state.cache().is_empty());
}
