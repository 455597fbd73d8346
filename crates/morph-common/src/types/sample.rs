use super::file::FileDescriptor;

/// Path of the built-in legacy sample
pub const SAMPLE_FILE_PATH: &str = "SecurityConfig.java";

/// Spring Security configuration written against the removed
/// `WebSecurityConfigurerAdapter` API.
pub const SAMPLE_LEGACY_CODE: &str = r#"package com.legacy.app.security;

import org.springframework.security.config.annotation.web.configuration.WebSecurityConfigurerAdapter;
import org.springframework.security.config.annotation.authentication.builders.AuthenticationManagerBuilder;

public class SecurityConfig extends WebSecurityConfigurerAdapter {

    @Override
    protected void configure(AuthenticationManagerBuilder auth) throws Exception {
        auth.inMemoryAuthentication()
            .withUser("admin").password("password").roles("ADMIN");
    }

    // Relies on the adapter API removed in Spring Security 6
}"#;

/// Descriptor an empty workspace starts with
pub fn sample_workspace_file() -> FileDescriptor {
    FileDescriptor::with_content(SAMPLE_FILE_PATH, SAMPLE_LEGACY_CODE)
}
