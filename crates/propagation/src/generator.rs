//! Random customers for load and demo runs.

use common::{Country, NewCustomer};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

const COMPANY_NAMES: [&str; 20] = [
    "Inversiones del Sol SAC",
    "Comercializadora Andina",
    "Servicios Logísticos del Pacifico",
    "Exportadora del Norte",
    "Tecnología y Sistemas Globales",
    "Agroindustrias del Valle EIRL",
    "Constructora e Inmobiliaria Horizonte",
    "Distribuidora de Alimentos del Sur",
    "Soluciones Mineras Integrales",
    "Factoría Textil de los Andes",
    "Consultores Financieros y Asociados",
    "Innovaciones Plásticas Industriales",
    "Transportes y Carga Panamericana",
    "Grupo Editorial Cóndor",
    "Desarrollos de Software Latinoamericanos",
    "Maderas y Enchapados de la Amazonía",
    "Laboratorios Químicos del Perú",
    "Proyectos Energéticos Renovables",
    "Clínica y Centro Médico San Pablo",
    "Academia de Idiomas El Continental",
];

const PERU_CITIES: [&str; 5] = ["Lima", "Arequipa", "Trujillo", "Chiclayo", "Tacna"];
const CHILE_CITIES: [&str; 4] = ["Santiago", "Valparaíso", "Concepción", "Temuco"];

/// Produces plausible random customers.
pub struct CustomerGenerator {
    rng: StdRng,
}

impl CustomerGenerator {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn cities(country: Country) -> &'static [&'static str] {
        match country {
            Country::Peru => &PERU_CITIES,
            Country::Chile => &CHILE_CITIES,
        }
    }

    pub fn next_customer(&mut self) -> NewCustomer {
        let country = if self.rng.random_bool(0.5) {
            Country::Peru
        } else {
            Country::Chile
        };
        let city = Self::cities(country)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();
        let company = COMPANY_NAMES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();

        let name = format!("{company} {}", self.rng.random_range(10..99));
        let tax_id = format!(
            "{}-{}",
            self.rng.random_range(10_000_000..99_999_999),
            self.rng.random_range(0..9)
        );

        NewCustomer::new(name, tax_id, city, country)
    }
}

impl Default for CustomerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for CustomerGenerator {
    type Item = NewCustomer;

    fn next(&mut self) -> Option<NewCustomer> {
        Some(self.next_customer())
    }
}
